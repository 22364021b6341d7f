//! Building/Normal/Editing/Moving protocol of a single tool.
//!
//! Every mutation is speculative: a full candidate anchor set is built,
//! validated, and only then committed. A rejected candidate leaves the tool
//! untouched.

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::{Anchor, BarSource, ChartContext, ChartScales, PixelPoint, copy_data_values};
use crate::error::DrawingResult;
use crate::geometry::snap_to_angle;
use crate::tools::{DrawingTool, HitTarget, MoveOrigin, ToolKind};

use super::{CursorStyle, DrawingState, InteractionConfig, PointerInput, PointerOutcome};

type Candidate = SmallVec<[Anchor; 3]>;

/// Checks a candidate anchor set against the bar domain.
///
/// Every anchor needs a finite slot inside
/// `[0, last_bar_index + future_slot_allowance]`; without bars nothing is
/// placeable. Building, editing and moving all go through this one rule.
#[must_use]
pub fn validate_candidate(
    anchors: &[Anchor],
    bars: &dyn BarSource,
    config: &InteractionConfig,
) -> bool {
    let Some(last) = bars.last_index() else {
        return false;
    };
    let max_slot = last as f64 + f64::from(config.future_slot_allowance);
    anchors
        .iter()
        .all(|anchor| anchor.slot_index.is_finite() && (0.0..=max_slot).contains(&anchor.slot_index))
}

impl DrawingTool {
    pub fn on_pointer_down(
        &mut self,
        input: PointerInput,
        ctx: ChartContext<'_>,
        config: &InteractionConfig,
    ) -> DrawingResult<PointerOutcome> {
        match self.state {
            DrawingState::Building => self.place_next_anchor(input, ctx, config),
            DrawingState::Normal => self.begin_interaction(input, ctx, config),
            DrawingState::Editing | DrawingState::Moving => Ok(PointerOutcome::Ignored),
        }
    }

    /// Returns whether the candidate produced by this motion was committed.
    pub fn on_pointer_move(
        &mut self,
        input: PointerInput,
        ctx: ChartContext<'_>,
        config: &InteractionConfig,
    ) -> DrawingResult<bool> {
        let candidate = match self.state {
            DrawingState::Normal => return Ok(false),
            DrawingState::Building => {
                let Some(next) = self.next_unplaced() else {
                    return Ok(false);
                };
                let point = self.snapped_point(next, input, ctx.scales, config)?;
                let mut candidate = self.anchors.clone();
                candidate[next].unproject(point, ctx.scales)?;
                for index in next + 1..candidate.len() {
                    let (placed, rest) = candidate.split_at_mut(index);
                    copy_data_values(&placed[next], &mut rest[0]);
                }
                let offset = derived_offset(self.kind(), &self.anchors);
                settle_derived(self.kind(), &mut candidate, offset, next, ctx.scales)?;
                candidate
            }
            DrawingState::Editing => {
                let Some(active) = self.active_anchor else {
                    return Ok(false);
                };
                let point = self.snapped_point(active, input, ctx.scales, config)?;
                let offset = derived_offset(self.kind(), &self.anchors);
                let mut candidate = self.anchors.clone();
                candidate[active].unproject(point, ctx.scales)?;
                settle_derived(self.kind(), &mut candidate, offset, active, ctx.scales)?;
                candidate
            }
            DrawingState::Moving => {
                let Some(origin) = self.move_origin.as_ref() else {
                    return Ok(false);
                };
                let dx = input.point.x - origin.pointer.x;
                let dy = input.point.y - origin.pointer.y;
                let mut candidate = self.anchors.clone();
                for (anchor, start) in candidate.iter_mut().zip(&origin.anchor_pixels) {
                    anchor.unproject(start.offset(dx, dy), ctx.scales)?;
                }
                // Every anchor moved by the same pixels; the translated derived
                // anchor defines the offset.
                if let Some(derived) = self.kind().derived_anchor() {
                    settle_derived(self.kind(), &mut candidate, 0.0, derived, ctx.scales)?;
                }
                candidate
            }
        };

        if !validate_candidate(&candidate, ctx.bars, config) {
            trace!(tool = %self.id(), state = ?self.state, "rejected pointer candidate");
            return Ok(false);
        }
        self.commit_anchors(candidate);
        Ok(true)
    }

    pub fn on_pointer_up(&mut self) -> PointerOutcome {
        match self.state {
            DrawingState::Editing => {
                if let Some(active) = self.active_anchor.take() {
                    self.anchors[active].is_editing = false;
                }
                self.state = DrawingState::Normal;
                debug!(tool = %self.id(), "edit finished");
                PointerOutcome::EditFinished
            }
            DrawingState::Moving => {
                self.move_origin = None;
                self.state = DrawingState::Normal;
                debug!(tool = %self.id(), "move finished");
                PointerOutcome::MoveFinished
            }
            DrawingState::Building | DrawingState::Normal => PointerOutcome::Ignored,
        }
    }

    /// Cursor for `point`; never mutates the tool.
    pub fn cursor_at(
        &self,
        point: PixelPoint,
        ctx: ChartContext<'_>,
        config: &InteractionConfig,
    ) -> DrawingResult<CursorStyle> {
        match self.state {
            DrawingState::Building => return Ok(CursorStyle::Draw),
            DrawingState::Moving => return Ok(CursorStyle::Move),
            DrawingState::Editing => {
                if let Some(active) = self.active_anchor {
                    return self.resize_cursor(active, ctx.scales);
                }
            }
            DrawingState::Normal => {}
        }

        match self.hit_test(point, ctx, config.sensitivity_px)? {
            None => Ok(CursorStyle::None),
            Some(_) if self.locked => Ok(CursorStyle::Forbidden),
            Some(HitTarget::Anchor(index)) => self.resize_cursor(index, ctx.scales),
            Some(HitTarget::Body) => Ok(CursorStyle::Move),
        }
    }

    fn next_unplaced(&self) -> Option<usize> {
        self.anchors.iter().position(|anchor| anchor.is_editing)
    }

    fn place_next_anchor(
        &mut self,
        input: PointerInput,
        ctx: ChartContext<'_>,
        config: &InteractionConfig,
    ) -> DrawingResult<PointerOutcome> {
        let Some(next) = self.next_unplaced() else {
            self.state = DrawingState::Normal;
            return Ok(PointerOutcome::BuildCompleted);
        };
        let point = self.snapped_point(next, input, ctx.scales, config)?;
        let offset = derived_offset(self.kind(), &self.anchors);

        let mut candidate = self.anchors.clone();
        candidate[next].unproject(point, ctx.scales)?;
        candidate[next].is_editing = false;
        // Unplaced anchors follow the committed one so the shape renders sanely.
        for index in next + 1..candidate.len() {
            let (placed, rest) = candidate.split_at_mut(index);
            copy_data_values(&placed[next], &mut rest[0]);
        }
        settle_derived(self.kind(), &mut candidate, offset, next, ctx.scales)?;

        if !validate_candidate(&candidate, ctx.bars, config) {
            debug!(tool = %self.id(), anchor = next, "rejected anchor placement");
            return Ok(PointerOutcome::Rejected);
        }
        self.commit_anchors(candidate);

        if next + 1 == self.anchors.len() {
            self.state = DrawingState::Normal;
            self.selected = true;
            debug!(tool = %self.id(), kind = self.kind().name(), "build completed");
            Ok(PointerOutcome::BuildCompleted)
        } else {
            trace!(tool = %self.id(), anchor = next, "anchor placed");
            Ok(PointerOutcome::AnchorPlaced(next))
        }
    }

    fn begin_interaction(
        &mut self,
        input: PointerInput,
        ctx: ChartContext<'_>,
        config: &InteractionConfig,
    ) -> DrawingResult<PointerOutcome> {
        let Some(target) = self.hit_test(input.point, ctx, config.sensitivity_px)? else {
            self.selected = false;
            return Ok(PointerOutcome::Deselected);
        };
        self.selected = true;
        if self.locked {
            return Ok(PointerOutcome::Selected);
        }

        match target {
            HitTarget::Anchor(index) => {
                self.anchors[index].is_editing = true;
                self.active_anchor = Some(index);
                self.state = DrawingState::Editing;
                debug!(tool = %self.id(), anchor = index, "edit started");
                Ok(PointerOutcome::EditStarted(index))
            }
            HitTarget::Body => {
                let anchor_pixels = self
                    .anchors
                    .iter()
                    .map(|anchor| anchor.project(ctx.scales))
                    .collect::<DrawingResult<_>>()?;
                self.move_origin = Some(MoveOrigin {
                    pointer: input.point,
                    anchor_pixels,
                });
                self.state = DrawingState::Moving;
                debug!(tool = %self.id(), "move started");
                Ok(PointerOutcome::MoveStarted)
            }
        }
    }

    /// Applies the angle-snap modifier relative to the anchor opposite
    /// `index`: the next anchor for the first one, otherwise the previous.
    fn snapped_point(
        &self,
        index: usize,
        input: PointerInput,
        scales: &dyn ChartScales,
        config: &InteractionConfig,
    ) -> DrawingResult<PixelPoint> {
        if !input.shift || self.kind().derived_anchor() == Some(index) {
            return Ok(input.point);
        }
        let opposite = match (index, self.anchors.len()) {
            (_, 0 | 1) => return Ok(input.point),
            (0, _) => 1,
            (other, _) => other - 1,
        };
        let anchor = &self.anchors[opposite];
        if anchor.is_editing && self.state == DrawingState::Building {
            return Ok(input.point);
        }
        let origin = anchor.project(scales)?;
        Ok(snap_to_angle(origin, input.point, config.angle_snap_step_degrees))
    }

    fn resize_cursor(&self, index: usize, scales: &dyn ChartScales) -> DrawingResult<CursorStyle> {
        if self.locked {
            return Ok(CursorStyle::Forbidden);
        }
        let style = match self.kind() {
            ToolKind::HorizontalLine => CursorStyle::ResizeVertical,
            ToolKind::VerticalLine => CursorStyle::ResizeHorizontal,
            ToolKind::Marker(_) | ToolKind::Text(_) => CursorStyle::Move,
            ToolKind::ParallelChannel if index == 2 => CursorStyle::ResizeVertical,
            _ => {
                let opposite = if index == 0 { 1 } else { index - 1 };
                let here = self.anchors[index].project(scales)?;
                let there = self.anchors[opposite].project(scales)?;
                let dx = here.x - there.x;
                let dy = here.y - there.y;
                if dx == 0.0 {
                    CursorStyle::ResizeVertical
                } else if dy == 0.0 {
                    CursorStyle::ResizeHorizontal
                } else if dx.signum() == dy.signum() {
                    CursorStyle::ResizeNwse
                } else {
                    CursorStyle::ResizeNesw
                }
            }
        };
        Ok(style)
    }
}

/// Price offset of the derived anchor from the midpoint of its base line.
fn derived_offset(kind: &ToolKind, anchors: &[Anchor]) -> f64 {
    match kind.derived_anchor() {
        Some(derived) if !anchors[derived].is_editing => {
            anchors[derived].price - (anchors[0].price + anchors[1].price) / 2.0
        }
        _ => 0.0,
    }
}

/// Re-derives the dependent anchor after `changed` moved.
///
/// The derived anchor always sits at the slot midpoint of the base line. When
/// the derived anchor itself was edited its new price defines the offset;
/// otherwise the previous offset is kept.
fn settle_derived(
    kind: &ToolKind,
    candidate: &mut Candidate,
    previous_offset: f64,
    changed: usize,
    scales: &dyn ChartScales,
) -> DrawingResult<()> {
    let Some(derived) = kind.derived_anchor() else {
        return Ok(());
    };
    let base_mid_price = (candidate[0].price + candidate[1].price) / 2.0;
    let offset = if changed == derived {
        candidate[derived].price - base_mid_price
    } else {
        previous_offset
    };
    let mid_slot = (candidate[0].slot_index + candidate[1].slot_index) / 2.0;
    candidate[derived].set_slot(mid_slot, scales)?;
    candidate[derived].price = base_mid_price + offset;
    Ok(())
}
