//! Drawing tool model: one sum type for every tool family plus the shared
//! per-tool state the interaction, alert and render layers operate on.

mod alert_support;
mod cache;
mod geometry;
mod render;

pub use cache::DerivedCache;
pub use geometry::{HitTarget, ResolvedLabel, ResolvedLine, ResolvedRegion, ToolGeometry};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use crate::core::{
    Anchor, ChartContext, ChartScales, HorizontalAxis, PixelPoint, PriceSelector, ToolId,
};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::DrawingState;
use crate::levels::{PriceLevel, fibonacci_extension_levels, fibonacci_retracement_levels};
use crate::regression::{ChannelMode, RegressionChannel};
use crate::style::{Stroke, ToolStyle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciParams {
    #[serde(with = "crate::levels::versioned")]
    pub levels: Vec<PriceLevel>,
    #[serde(default)]
    pub extend_left: bool,
    #[serde(default)]
    pub extend_right: bool,
}

impl FibonacciParams {
    #[must_use]
    pub fn retracement(stroke: Stroke) -> Self {
        Self {
            levels: fibonacci_retracement_levels(stroke),
            extend_left: false,
            extend_right: false,
        }
    }

    #[must_use]
    pub fn extension(stroke: Stroke) -> Self {
        Self {
            levels: fibonacci_extension_levels(stroke),
            extend_left: false,
            extend_right: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RegressionParams {
    #[serde(default)]
    pub selector: PriceSelector,
    #[serde(default)]
    pub mode: ChannelMode,
    #[serde(default)]
    pub extend_left: bool,
    #[serde(default)]
    pub extend_right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
    Diamond,
    Dot,
    Square,
    TriangleUp,
    TriangleDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerParams {
    pub shape: MarkerShape,
    pub size_px: f64,
}

impl MarkerParams {
    #[must_use]
    pub const fn new(shape: MarkerShape) -> Self {
        Self {
            shape,
            size_px: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextParams {
    pub text: String,
    pub font_size_px: f64,
}

impl TextParams {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size_px: 12.0,
        }
    }
}

/// Every supported tool family.
///
/// Behavior that differs per family (anchors, geometry, visibility, alerts)
/// is one exhaustive `match` on this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolKind {
    HorizontalLine,
    VerticalLine,
    Line,
    Ray,
    ExtendedLine,
    ArrowLine,
    Rectangle,
    Ellipse,
    Triangle,
    /// Trend line plus a parallel copy; the third anchor is derived and only
    /// carries the price offset.
    ParallelChannel,
    FibonacciRetracement(FibonacciParams),
    FibonacciExtension(FibonacciParams),
    RegressionChannel(RegressionParams),
    Marker(MarkerParams),
    Text(TextParams),
}

impl ToolKind {
    /// Anchor display names in their fixed declared order.
    #[must_use]
    pub fn anchor_roles(&self) -> &'static [&'static str] {
        match self {
            Self::HorizontalLine | Self::VerticalLine | Self::Marker(_) | Self::Text(_) => {
                &["Anchor"]
            }
            Self::Line
            | Self::Ray
            | Self::ExtendedLine
            | Self::ArrowLine
            | Self::Rectangle
            | Self::Ellipse
            | Self::FibonacciRetracement(_)
            | Self::RegressionChannel(_) => &["Start", "End"],
            Self::Triangle => &["Start", "Middle", "End"],
            Self::ParallelChannel => &["Start", "End", "Offset"],
            Self::FibonacciExtension(_) => &["Start", "End", "Extension"],
        }
    }

    #[must_use]
    pub fn anchor_count(&self) -> usize {
        self.anchor_roles().len()
    }

    /// Index of the anchor whose position follows the others.
    #[must_use]
    pub fn derived_anchor(&self) -> Option<usize> {
        match self {
            Self::ParallelChannel => Some(2),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::HorizontalLine => "Horizontal line",
            Self::VerticalLine => "Vertical line",
            Self::Line => "Line",
            Self::Ray => "Ray",
            Self::ExtendedLine => "Extended line",
            Self::ArrowLine => "Arrow line",
            Self::Rectangle => "Rectangle",
            Self::Ellipse => "Ellipse",
            Self::Triangle => "Triangle",
            Self::ParallelChannel => "Parallel channel",
            Self::FibonacciRetracement(_) => "Fibonacci retracement",
            Self::FibonacciExtension(_) => "Fibonacci extension",
            Self::RegressionChannel(_) => "Regression channel",
            Self::Marker(_) => "Marker",
            Self::Text(_) => "Text",
        }
    }

    pub fn validate(&self) -> DrawingResult<()> {
        match self {
            Self::FibonacciRetracement(params) | Self::FibonacciExtension(params) => {
                for level in &params.levels {
                    if !level.value.is_finite() {
                        return Err(DrawingError::argument(
                            "levels",
                            "level values must be finite",
                        ));
                    }
                    level.stroke.validate()?;
                }
            }
            Self::RegressionChannel(params) => {
                if let ChannelMode::StandardDeviation {
                    upper_multiplier,
                    lower_multiplier,
                } = params.mode
                {
                    if !upper_multiplier.is_finite() || !lower_multiplier.is_finite() {
                        return Err(DrawingError::argument(
                            "mode",
                            "deviation multipliers must be finite",
                        ));
                    }
                }
            }
            Self::Marker(params) => {
                if !params.size_px.is_finite() || params.size_px <= 0.0 {
                    return Err(DrawingError::argument(
                        "size_px",
                        "marker size must be finite and > 0",
                    ));
                }
            }
            Self::Text(params) => {
                if !params.font_size_px.is_finite() || params.font_size_px <= 0.0 {
                    return Err(DrawingError::argument(
                        "font_size_px",
                        "font size must be finite and > 0",
                    ));
                }
            }
            Self::HorizontalLine
            | Self::VerticalLine
            | Self::Line
            | Self::Ray
            | Self::ExtendedLine
            | Self::ArrowLine
            | Self::Rectangle
            | Self::Ellipse
            | Self::Triangle
            | Self::ParallelChannel => {}
        }
        Ok(())
    }
}

/// Estimated text block, enough for hit testing and label placement.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    pub width_px: f64,
    pub height_px: f64,
    pub line_height_px: f64,
}

impl TextLayout {
    const CHAR_WIDTH_RATIO: f64 = 0.6;
    const LINE_HEIGHT_RATIO: f64 = 1.2;

    #[must_use]
    pub fn estimate(params: &TextParams) -> Self {
        let lines: Vec<String> = params.text.lines().map(str::to_owned).collect();
        let longest = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let line_height_px = params.font_size_px * Self::LINE_HEIGHT_RATIO;
        Self {
            width_px: longest as f64 * params.font_size_px * Self::CHAR_WIDTH_RATIO,
            height_px: lines.len().max(1) as f64 * line_height_px,
            line_height_px,
            lines,
        }
    }
}

/// Pointer and anchor pixels captured when a move starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MoveOrigin {
    pub pointer: PixelPoint,
    pub anchor_pixels: SmallVec<[PixelPoint; 3]>,
}

/// One drawing object on the chart.
#[derive(Debug, Clone)]
pub struct DrawingTool {
    id: ToolId,
    tag: String,
    owner: Option<String>,
    kind: ToolKind,
    pub(crate) anchors: SmallVec<[Anchor; 3]>,
    pub(crate) state: DrawingState,
    pub style: ToolStyle,
    pub locked: bool,
    pub is_global: bool,
    pub selected: bool,
    template_name: Option<String>,
    pub(crate) active_anchor: Option<usize>,
    pub(crate) move_origin: Option<MoveOrigin>,
    regression_cache: DerivedCache<RegressionChannel>,
    text_cache: DerivedCache<TextLayout>,
}

impl DrawingTool {
    /// Starts an interactively drawn tool: every anchor unplaced, state
    /// `Building`.
    #[must_use]
    pub fn new(id: ToolId, kind: ToolKind, style: ToolStyle, axis: HorizontalAxis) -> Self {
        let anchors = kind
            .anchor_roles()
            .iter()
            .map(|role| {
                let mut anchor = Anchor::unplaced(*role, axis);
                anchor.bind_owner(id);
                anchor
            })
            .collect();
        Self {
            id,
            tag: id.to_string(),
            owner: None,
            kind,
            anchors,
            state: DrawingState::Building,
            style,
            locked: false,
            is_global: false,
            selected: false,
            template_name: None,
            active_anchor: None,
            move_origin: None,
            regression_cache: DerivedCache::new(),
            text_cache: DerivedCache::new(),
        }
    }

    /// Tool with every anchor already placed, state `Normal`.
    pub fn placed(
        id: ToolId,
        kind: ToolKind,
        style: ToolStyle,
        anchors: Vec<Anchor>,
        scales: &dyn ChartScales,
    ) -> DrawingResult<Self> {
        if anchors.len() != kind.anchor_count() {
            return Err(DrawingError::argument(
                "anchors",
                format!(
                    "{} expects {} anchors, got {}",
                    kind.name(),
                    kind.anchor_count(),
                    anchors.len()
                ),
            ));
        }
        let roles = kind.anchor_roles();
        let mut tool = Self::new(id, kind, style, scales.horizontal_axis());
        for ((slot, mut anchor), role) in tool.anchors.iter_mut().zip(anchors).zip(roles) {
            anchor.refresh_slot(scales)?;
            anchor.is_editing = false;
            if anchor.display_name.is_empty() {
                anchor.display_name = (*role).to_owned();
            }
            anchor.bind_owner(id);
            *slot = anchor;
        }
        // The derived anchor's price is taken as given; its slot follows the base line.
        if let Some(derived) = tool.kind.derived_anchor() {
            let mid_slot = (tool.anchors[0].slot_index + tool.anchors[1].slot_index) / 2.0;
            tool.anchors[derived].set_slot(mid_slot, scales)?;
        }
        tool.state = DrawingState::Normal;
        Ok(tool)
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn with_template_name(mut self, template_name: Option<String>) -> Self {
        self.template_name = template_name;
        self
    }

    #[must_use]
    pub fn id(&self) -> ToolId {
        self.id
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    #[must_use]
    pub fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> &ToolKind {
        &self.kind
    }

    /// Edits family parameters (levels, regression mode, text, ...). Anchor
    /// roles cannot change, so switching to another family is rejected.
    pub fn modify_kind(&mut self, edit: impl FnOnce(&mut ToolKind)) -> DrawingResult<()> {
        let mut candidate = self.kind.clone();
        edit(&mut candidate);
        if candidate.anchor_roles() != self.kind.anchor_roles()
            || std::mem::discriminant(&candidate) != std::mem::discriminant(&self.kind)
        {
            return Err(DrawingError::argument(
                "kind",
                "a tool cannot change its family",
            ));
        }
        candidate.validate()?;
        self.kind = candidate;
        self.invalidate_derived();
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> DrawingState {
        self.state
    }

    #[must_use]
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    #[must_use]
    pub fn active_anchor(&self) -> Option<usize> {
        self.active_anchor
    }

    /// Replaces every anchor's data values at once. The anchor count must
    /// match and the tool must not be mid-build.
    pub fn set_anchor_values(
        &mut self,
        values: &[Anchor],
        scales: &dyn ChartScales,
    ) -> DrawingResult<()> {
        if values.len() != self.anchors.len() {
            return Err(DrawingError::argument(
                "anchors",
                format!("expected {} anchors, got {}", self.anchors.len(), values.len()),
            ));
        }
        let mut candidate = self.anchors.clone();
        for (target, source) in candidate.iter_mut().zip(values) {
            crate::core::copy_data_values(source, target);
            target.refresh_slot(scales)?;
        }
        self.commit_anchors(candidate);
        Ok(())
    }

    /// Recomputes cached slots after the host's time axis changed.
    pub fn refresh_slots(&mut self, scales: &dyn ChartScales) -> DrawingResult<()> {
        for anchor in &mut self.anchors {
            if !anchor.is_editing || self.state != DrawingState::Building {
                anchor.refresh_slot(scales)?;
            }
        }
        self.invalidate_derived();
        Ok(())
    }

    pub(crate) fn commit_anchors(&mut self, candidate: SmallVec<[Anchor; 3]>) {
        self.anchors = candidate;
        self.invalidate_derived();
    }

    /// Marks every derived value stale.
    pub fn invalidate_derived(&self) {
        self.regression_cache.invalidate();
        self.text_cache.invalidate();
    }

    /// Regression output for regression-channel tools, recomputed only when
    /// anchors, parameters or bars changed.
    pub fn regression_channel(
        &self,
        ctx: ChartContext<'_>,
    ) -> DrawingResult<Option<RegressionChannel>> {
        let ToolKind::RegressionChannel(params) = &self.kind else {
            return Ok(None);
        };
        let Some(last) = ctx.bars.last_index() else {
            return Ok(None);
        };
        let clamp = |slot: f64| {
            if slot.is_finite() {
                slot.round().clamp(0.0, last as f64) as usize
            } else {
                0
            }
        };
        let start = clamp(self.anchors[0].slot_index);
        let end = clamp(self.anchors[1].slot_index);
        let channel = self.regression_cache.get_or_try_recompute(|| {
            trace!(tool = %self.id, start, end, "recomputing regression channel");
            crate::regression::compute_regression_channel(
                ctx.bars,
                start,
                end,
                params.selector,
                params.mode,
            )
        })?;
        Ok(Some(channel))
    }

    pub fn text_layout(&self) -> Option<TextLayout> {
        let ToolKind::Text(params) = &self.kind else {
            return None;
        };
        self.text_cache
            .get_or_try_recompute(|| Ok::<_, DrawingError>(TextLayout::estimate(params)))
            .ok()
    }

    /// Visibility for a visible slot range.
    #[must_use]
    pub fn is_visible_in_slots(&self, visible: (f64, f64)) -> bool {
        let (first, last) = (visible.0.min(visible.1), visible.0.max(visible.1));
        let slots: SmallVec<[f64; 3]> = self.anchors.iter().map(|a| a.slot_index).collect();
        if slots.iter().any(|slot| !slot.is_finite()) {
            return false;
        }
        let min = slots.iter().copied().fold(f64::INFINITY, f64::min);
        let max = slots.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let overlaps = |lo: f64, hi: f64| lo <= last && hi >= first;

        match &self.kind {
            ToolKind::HorizontalLine | ToolKind::ExtendedLine => true,
            ToolKind::VerticalLine | ToolKind::Marker(_) | ToolKind::Text(_) => {
                overlaps(slots[0], slots[0])
            }
            ToolKind::Ray => {
                let (start, end) = (slots[0], slots[1]);
                if end > start {
                    overlaps(start, f64::INFINITY)
                } else if end < start {
                    overlaps(f64::NEG_INFINITY, start)
                } else {
                    overlaps(start, start)
                }
            }
            ToolKind::FibonacciRetracement(params) | ToolKind::FibonacciExtension(params) => {
                overlaps(
                    if params.extend_left { f64::NEG_INFINITY } else { min },
                    if params.extend_right { f64::INFINITY } else { max },
                )
            }
            ToolKind::RegressionChannel(params) => overlaps(
                if params.extend_left { f64::NEG_INFINITY } else { min },
                if params.extend_right { f64::INFINITY } else { max },
            ),
            ToolKind::Line
            | ToolKind::ArrowLine
            | ToolKind::Rectangle
            | ToolKind::Ellipse
            | ToolKind::Triangle
            | ToolKind::ParallelChannel => overlaps(min, max),
        }
    }

    /// Visibility for the chart's current visible range.
    pub fn is_visible_on_chart(&self, ctx: ChartContext<'_>) -> DrawingResult<bool> {
        if self.state == DrawingState::Building {
            return Ok(true);
        }
        Ok(self.is_visible_in_slots(ctx.scales.visible_slot_range()?))
    }

    /// Pixel positions of the selection handles.
    pub fn selection_points(&self, ctx: ChartContext<'_>) -> DrawingResult<Vec<PixelPoint>> {
        self.anchors
            .iter()
            .map(|anchor| anchor.project(ctx.scales))
            .collect()
    }
}
