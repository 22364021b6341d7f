use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{Anchor, AnchorPosition, BarSource, ChartScales, HorizontalAxis, ToolId};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{DrawingState, validate_candidate};
use crate::style::ToolStyle;
use crate::tools::{DrawingTool, ToolKind};

use super::DrawingEngine;

/// Programmatic anchor: a bar offset from the newest bar or a timestamp,
/// plus a price. A valid `bars_ago` wins over `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bars_ago: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    pub price: f64,
}

impl AnchorSpec {
    #[must_use]
    pub const fn bars_ago(bars_ago: i64, price: f64) -> Self {
        Self {
            bars_ago: Some(bars_ago),
            time: None,
            price,
        }
    }

    #[must_use]
    pub const fn at_time(time: f64, price: f64) -> Self {
        Self {
            bars_ago: None,
            time: Some(time),
            price,
        }
    }
}

/// Input of [`DrawingEngine::create_tool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Script or component that owns the tool. Required.
    pub owner: Option<String>,
    /// Unique per engine; reusing a tag replaces the earlier scripted tool.
    pub tag: String,
    pub kind: ToolKind,
    pub anchors: Vec<AnchorSpec>,
    #[serde(default)]
    pub style: ToolStyle,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub template_name: Option<String>,
}

impl ToolRequest {
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        tag: impl Into<String>,
        kind: ToolKind,
        anchors: Vec<AnchorSpec>,
    ) -> Self {
        Self {
            owner: Some(owner.into()),
            tag: tag.into(),
            kind,
            anchors,
            style: ToolStyle::default(),
            is_global: false,
            template_name: None,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: ToolStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }

    #[must_use]
    pub fn with_template(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = Some(template_name.into());
        self
    }
}

impl<S: ChartScales> DrawingEngine<S> {
    /// Creates a fully placed tool.
    ///
    /// Fails fast on a missing owner, an empty tag, a wrong anchor count, or
    /// an anchor without a valid bar offset or timestamp. A tool already
    /// using the (scoped) tag is replaced.
    pub fn create_tool(&mut self, request: ToolRequest) -> DrawingResult<ToolId> {
        let owner = request
            .owner
            .as_deref()
            .map(str::trim)
            .filter(|owner| !owner.is_empty())
            .ok_or_else(|| DrawingError::argument("owner", "a tool must have an owner"))?
            .to_owned();
        if request.tag.trim().is_empty() {
            return Err(DrawingError::argument("tag", "tag must not be empty"));
        }
        request.kind.validate()?;
        if request.anchors.len() != request.kind.anchor_count() {
            return Err(DrawingError::argument(
                "anchors",
                format!(
                    "{} expects {} anchors, got {}",
                    request.kind.name(),
                    request.kind.anchor_count(),
                    request.anchors.len()
                ),
            ));
        }

        let style = self.resolve_style(request.style, request.template_name.as_deref());
        style.validate()?;
        let anchors = request
            .anchors
            .iter()
            .enumerate()
            .map(|(index, spec)| resolve_anchor(index, *spec, &self.scales, &self.bars))
            .collect::<DrawingResult<Vec<_>>>()?;

        let tag = self.scoped_tag(&request.tag, request.is_global);
        let id = self.allocate_id();
        let mut tool = DrawingTool::placed(id, request.kind, style, anchors, &self.scales)?
            .with_tag(tag)
            .with_owner(owner)
            .with_template_name(request.template_name);
        tool.is_global = request.is_global;

        if !validate_candidate(tool.anchors(), &self.bars, &self.config.interaction) {
            return Err(DrawingError::argument(
                "anchors",
                "anchors must lie within the available bar range",
            ));
        }
        Ok(self.insert_tool(tool))
    }

    /// Inserts `tool` on top. An owned tool replaces the owned tool sharing its tag;
    /// user-drawn tools carry no owner and are never replaced by tag.
    pub(super) fn insert_tool(&mut self, tool: DrawingTool) -> ToolId {
        let id = tool.id();
        let previous = tool.owner().and_then(|_| {
            self.tools
                .values()
                .find(|existing| existing.owner().is_some() && existing.tag() == tool.tag())
                .map(DrawingTool::id)
        });
        if let Some(previous) = previous {
            self.tools.shift_remove(&previous);
            if self.active == Some(previous) {
                self.active = None;
            }
            debug!(replaced = %previous, tool = %id, tag = tool.tag(), "replaced tool with same tag");
        }
        debug!(tool = %id, kind = tool.kind().name(), tag = tool.tag(), "created tool");
        self.tools.insert(id, tool);
        id
    }

    /// Registers a named style applied by requests carrying its name.
    pub fn register_template(&mut self, name: impl Into<String>, style: ToolStyle) -> DrawingResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DrawingError::argument("template_name", "template name must not be empty"));
        }
        style.validate()?;
        self.templates.insert(name, style);
        Ok(())
    }

    /// Starts interactive creation; the new tool receives pointer input until
    /// its last anchor is placed. A tool still being built is discarded.
    pub fn begin_drawing(&mut self, kind: ToolKind, style: ToolStyle) -> DrawingResult<ToolId> {
        kind.validate()?;
        style.validate()?;
        self.cancel_drawing();
        let id = self.allocate_id();
        let tool = DrawingTool::new(id, kind, style, self.scales.horizontal_axis());
        self.insert_tool(tool);
        self.active = Some(id);
        Ok(id)
    }

    /// Discards the tool currently being built, if any.
    pub fn cancel_drawing(&mut self) -> Option<DrawingTool> {
        let building = self
            .tools
            .values()
            .find(|tool| tool.state() == DrawingState::Building)
            .map(DrawingTool::id)?;
        if self.active == Some(building) {
            self.active = None;
        }
        debug!(tool = %building, "discarded tool in building state");
        self.tools.shift_remove(&building)
    }

    fn resolve_style(&self, requested: ToolStyle, template_name: Option<&str>) -> ToolStyle {
        match template_name {
            None => requested,
            Some(name) => self.templates.get(name).copied().unwrap_or_else(|| {
                warn!(template = name, "unknown template; using the requested style");
                requested
            }),
        }
    }

    fn scoped_tag(&self, tag: &str, is_global: bool) -> String {
        let prefix = &self.config.global_tag_prefix;
        if is_global && !tag.starts_with(prefix.as_str()) {
            format!("{prefix}{tag}")
        } else {
            tag.to_owned()
        }
    }
}

/// Turns an [`AnchorSpec`] into an anchor keyed the way the chart's axis expects.
pub(super) fn resolve_anchor(
    index: usize,
    spec: AnchorSpec,
    scales: &dyn ChartScales,
    bars: &dyn BarSource,
) -> DrawingResult<Anchor> {
    if !spec.price.is_finite() {
        return Err(DrawingError::argument(
            "anchors",
            format!("anchor {index} price must be finite"),
        ));
    }
    let position = spec
        .bars_ago
        .and_then(|bars_ago| position_from_bars_ago(bars_ago, scales, bars))
        .or_else(|| spec.time.and_then(|time| position_from_time(time, scales, bars)))
        .ok_or_else(|| {
            DrawingError::argument(
                "anchors",
                format!("anchor {index} needs a valid bar offset or timestamp"),
            )
        })?;
    Ok(Anchor::new(position, spec.price))
}

fn position_from_bars_ago(
    bars_ago: i64,
    scales: &dyn ChartScales,
    bars: &dyn BarSource,
) -> Option<AnchorPosition> {
    let last = i64::try_from(bars.last_index()?).ok()?;
    let index = last.checked_sub(bars_ago)?;
    if index < 0 {
        return None;
    }
    match scales.horizontal_axis() {
        HorizontalAxis::BarIndex => Some(AnchorPosition::BarIndex(index)),
        HorizontalAxis::Time => {
            let time = usize::try_from(index)
                .ok()
                .and_then(|index| bars.bar(index))
                .map(|bar| bar.time)
                .or_else(|| scales.slot_to_time(index as f64).ok())?;
            Some(AnchorPosition::Time(time))
        }
    }
}

fn position_from_time(
    time: f64,
    scales: &dyn ChartScales,
    bars: &dyn BarSource,
) -> Option<AnchorPosition> {
    if !time.is_finite() {
        return None;
    }
    match scales.horizontal_axis() {
        HorizontalAxis::Time => Some(AnchorPosition::Time(time)),
        HorizontalAxis::BarIndex => {
            let index = bars.index_of_time(time)?;
            Some(AnchorPosition::BarIndex(i64::try_from(index).ok()?))
        }
    }
}
