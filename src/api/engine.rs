use indexmap::IndexMap;
use tracing::debug;

use crate::alerts::{AlertCondition, AlertConditionItem, AlertSample};
use crate::core::{ChartContext, ChartScales, OhlcBar, ToolId};
use crate::error::{DrawingError, DrawingResult};
use crate::render::{DrawingFrame, Renderer};
use crate::style::ToolStyle;
use crate::tools::DrawingTool;

use super::DrawingEngineConfig;

/// Main facade consumed by host charts.
///
/// `DrawingEngine` owns every drawing tool of one chart panel in z-order
/// (last is topmost), routes pointer input to them, and answers visibility,
/// alert and render queries against the host's scales and bars.
pub struct DrawingEngine<S: ChartScales> {
    pub(super) config: DrawingEngineConfig,
    pub(super) scales: S,
    pub(super) bars: Vec<OhlcBar>,
    pub(super) tools: IndexMap<ToolId, DrawingTool>,
    pub(super) templates: IndexMap<String, ToolStyle>,
    pub(super) active: Option<ToolId>,
    next_id: u64,
}

impl<S: ChartScales> DrawingEngine<S> {
    pub fn new(config: DrawingEngineConfig, scales: S) -> DrawingResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scales,
            bars: Vec::new(),
            tools: IndexMap::new(),
            templates: IndexMap::new(),
            active: None,
            next_id: 1,
        })
    }

    #[must_use]
    pub fn config(&self) -> &DrawingEngineConfig {
        &self.config
    }

    #[must_use]
    pub fn scales(&self) -> &S {
        &self.scales
    }

    /// Mutable scales for visible-range changes. Use [`Self::set_scales`]
    /// when the time axis itself changes.
    pub fn scales_mut(&mut self) -> &mut S {
        &mut self.scales
    }

    /// Replaces the scales and re-derives every cached anchor slot.
    pub fn set_scales(&mut self, scales: S) -> DrawingResult<()> {
        self.scales = scales;
        self.refresh_all_slots()
    }

    #[must_use]
    pub fn bars(&self) -> &[OhlcBar] {
        &self.bars
    }

    /// Replaces the bar series; derived values (regression channels) are
    /// recomputed on next use.
    pub fn set_bars(&mut self, bars: Vec<OhlcBar>) -> DrawingResult<()> {
        if bars.windows(2).any(|pair| pair[1].time < pair[0].time) {
            return Err(DrawingError::InvalidData(
                "bars must be sorted by time".to_owned(),
            ));
        }
        debug!(count = bars.len(), "replacing bars");
        self.bars = bars;
        self.refresh_all_slots()
    }

    /// Appends one bar, e.g. from a live feed.
    pub fn push_bar(&mut self, bar: OhlcBar) -> DrawingResult<()> {
        if self.bars.last().is_some_and(|last| bar.time < last.time) {
            return Err(DrawingError::InvalidData(
                "appended bar must not be older than the last bar".to_owned(),
            ));
        }
        self.bars.push(bar);
        for tool in self.tools.values() {
            tool.invalidate_derived();
        }
        Ok(())
    }

    fn refresh_all_slots(&mut self) -> DrawingResult<()> {
        for tool in self.tools.values_mut() {
            tool.refresh_slots(&self.scales)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn context(&self) -> ChartContext<'_> {
        ChartContext::new(&self.scales, &self.bars)
    }

    pub(super) fn allocate_id(&mut self) -> ToolId {
        let id = ToolId(self.next_id);
        self.next_id += 1;
        id
    }

    #[must_use]
    pub fn tool(&self, id: ToolId) -> Option<&DrawingTool> {
        self.tools.get(&id)
    }

    pub fn tool_mut(&mut self, id: ToolId) -> Option<&mut DrawingTool> {
        self.tools.get_mut(&id)
    }

    #[must_use]
    pub fn tool_by_tag(&self, tag: &str) -> Option<&DrawingTool> {
        self.tools.values().find(|tool| tool.tag() == tag)
    }

    /// Tools in z-order, bottom first.
    pub fn tools(&self) -> impl Iterator<Item = &DrawingTool> {
        self.tools.values()
    }

    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Tools shared across every chart of the instrument.
    #[must_use]
    pub fn global_tools(&self) -> Vec<&DrawingTool> {
        self.tools.values().filter(|tool| tool.is_global).collect()
    }

    pub fn remove_tool(&mut self, id: ToolId) -> DrawingResult<DrawingTool> {
        let tool = self
            .tools
            .shift_remove(&id)
            .ok_or(DrawingError::UnknownTool(id))?;
        if self.active == Some(id) {
            self.active = None;
        }
        debug!(tool = %id, tag = tool.tag(), "removed tool");
        Ok(tool)
    }

    /// Ids of tools intersecting the visible range.
    pub fn visible_tools(&self) -> DrawingResult<Vec<ToolId>> {
        let ctx = self.context();
        let mut visible = Vec::new();
        for (id, tool) in &self.tools {
            if tool.is_visible_on_chart(ctx)? {
                visible.push(*id);
            }
        }
        Ok(visible)
    }

    pub fn alert_conditions(&self, id: ToolId) -> DrawingResult<Vec<AlertConditionItem>> {
        Ok(self.require(id)?.alert_conditions())
    }

    pub fn evaluate_alert(
        &self,
        id: ToolId,
        condition: AlertCondition,
        samples: &[AlertSample],
    ) -> DrawingResult<bool> {
        self.require(id)?.evaluate_alert(
            condition,
            samples,
            self.context(),
            self.config.alert_equal_tolerance_px,
        )
    }

    /// Materializes every visible tool into one frame.
    pub fn build_frame(&self) -> DrawingResult<DrawingFrame> {
        let ctx = self.context();
        let mut frame = DrawingFrame::new(self.config.viewport);
        for tool in self.tools.values() {
            if tool.is_visible_on_chart(ctx)? {
                tool.render_into(ctx, &mut frame)?;
            }
        }
        Ok(frame)
    }

    pub fn render<R: Renderer>(&self, renderer: &mut R) -> DrawingResult<()> {
        let frame = self.build_frame()?;
        renderer.render(&frame)
    }

    pub(super) fn require(&self, id: ToolId) -> DrawingResult<&DrawingTool> {
        self.tools.get(&id).ok_or(DrawingError::UnknownTool(id))
    }
}
