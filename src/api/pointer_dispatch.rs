use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{ChartContext, ChartScales, PixelPoint, ToolId};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{CursorStyle, DrawingState, PointerInput, PointerOutcome};

use super::DrawingEngine;

/// Which tool handled a pointer event and what it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerDispatch {
    pub tool: Option<ToolId>,
    pub outcome: PointerOutcome,
}

impl PointerDispatch {
    const fn new(tool: Option<ToolId>, outcome: PointerOutcome) -> Self {
        Self { tool, outcome }
    }
}

impl<S: ChartScales> DrawingEngine<S> {
    /// Tool currently building, editing or moving.
    #[must_use]
    pub fn active_tool(&self) -> Option<ToolId> {
        self.active
    }

    /// Primary-button press: feeds the tool being built, otherwise the
    /// topmost tool under the pointer. Every other tool is deselected.
    pub fn pointer_down(&mut self, input: PointerInput) -> DrawingResult<PointerDispatch> {
        let ctx = ChartContext::new(&self.scales, &self.bars);
        let config = self.config.interaction;

        if let Some(id) = self.active {
            if let Some(tool) = self.tools.get_mut(&id) {
                if tool.state() == DrawingState::Building {
                    let outcome = tool.on_pointer_down(input, ctx, &config)?;
                    if outcome == PointerOutcome::BuildCompleted {
                        self.active = None;
                    }
                    return Ok(PointerDispatch::new(Some(id), outcome));
                }
            }
        }

        let mut hit = None;
        for (id, tool) in self.tools.iter().rev() {
            if tool.state() == DrawingState::Building {
                continue;
            }
            if tool
                .hit_test(input.point, ctx, config.sensitivity_px)?
                .is_some()
            {
                hit = Some(*id);
                break;
            }
        }
        for (id, tool) in &mut self.tools {
            if Some(*id) != hit {
                tool.selected = false;
            }
        }

        let Some(id) = hit else {
            trace!("pointer down missed every tool");
            return Ok(PointerDispatch::new(None, PointerOutcome::Deselected));
        };
        let tool = self
            .tools
            .get_mut(&id)
            .ok_or(DrawingError::UnknownTool(id))?;
        let outcome = tool.on_pointer_down(input, ctx, &config)?;
        if matches!(
            outcome,
            PointerOutcome::EditStarted(_) | PointerOutcome::MoveStarted
        ) {
            self.active = Some(id);
        }
        Ok(PointerDispatch::new(Some(id), outcome))
    }

    /// Pointer motion; returns whether the active tool accepted the candidate.
    pub fn pointer_move(&mut self, input: PointerInput) -> DrawingResult<bool> {
        let Some(id) = self.active else {
            return Ok(false);
        };
        let ctx = ChartContext::new(&self.scales, &self.bars);
        let config = self.config.interaction;
        let tool = self
            .tools
            .get_mut(&id)
            .ok_or(DrawingError::UnknownTool(id))?;
        tool.on_pointer_move(input, ctx, &config)
    }

    pub fn pointer_up(&mut self) -> PointerDispatch {
        let Some(id) = self.active else {
            return PointerDispatch::new(None, PointerOutcome::Ignored);
        };
        let Some(tool) = self.tools.get_mut(&id) else {
            self.active = None;
            return PointerDispatch::new(None, PointerOutcome::Ignored);
        };
        let outcome = tool.on_pointer_up();
        if matches!(
            outcome,
            PointerOutcome::EditFinished | PointerOutcome::MoveFinished
        ) {
            self.active = None;
        }
        PointerDispatch::new(Some(id), outcome)
    }

    /// Cursor for `point`: the active tool decides, otherwise the topmost
    /// tool with an opinion.
    pub fn cursor_at(&self, point: PixelPoint) -> DrawingResult<CursorStyle> {
        let ctx = self.context();
        let config = &self.config.interaction;
        if let Some(tool) = self.active.and_then(|id| self.tools.get(&id)) {
            return tool.cursor_at(point, ctx, config);
        }
        for tool in self.tools.values().rev() {
            let cursor = tool.cursor_at(point, ctx, config)?;
            if cursor != CursorStyle::None {
                return Ok(cursor);
            }
        }
        Ok(CursorStyle::None)
    }
}
