mod state_machine;

pub use state_machine::validate_candidate;

use serde::{Deserialize, Serialize};

use crate::core::PixelPoint;
use crate::error::{DrawingError, DrawingResult};

/// Per-tool interaction state. `Building` is the only initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawingState {
    Building,
    Normal,
    Editing,
    Moving,
}

/// Cursor affordance requested from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CursorStyle {
    #[default]
    None,
    Draw,
    Forbidden,
    Move,
    ResizeHorizontal,
    ResizeVertical,
    ResizeNwse,
    ResizeNesw,
}

/// Pointer event in panel pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub point: PixelPoint,
    /// Angle-snap modifier.
    pub shift: bool,
}

impl PointerInput {
    #[must_use]
    pub const fn at(x: f64, y: f64) -> Self {
        Self {
            point: PixelPoint::new(x, y),
            shift: false,
        }
    }

    #[must_use]
    pub const fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }
}

/// What a pointer event did to a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerOutcome {
    /// Anchor `n` committed while building; more anchors remain.
    AnchorPlaced(usize),
    /// Last anchor committed; the tool is now `Normal`.
    BuildCompleted,
    EditStarted(usize),
    MoveStarted,
    /// Hit on a locked tool: selected, not editable.
    Selected,
    Deselected,
    /// Candidate failed validation; nothing changed.
    Rejected,
    Ignored,
    EditFinished,
    MoveFinished,
}

/// Hit-testing and edit-validation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "default_sensitivity_px")]
    pub sensitivity_px: f64,
    #[serde(default = "default_angle_snap_step_degrees")]
    pub angle_snap_step_degrees: f64,
    /// Slots past the last bar that anchors may still occupy.
    #[serde(default = "default_future_slot_allowance")]
    pub future_slot_allowance: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            sensitivity_px: default_sensitivity_px(),
            angle_snap_step_degrees: default_angle_snap_step_degrees(),
            future_slot_allowance: default_future_slot_allowance(),
        }
    }
}

impl InteractionConfig {
    pub fn validate(self) -> DrawingResult<()> {
        if !self.sensitivity_px.is_finite() || self.sensitivity_px <= 0.0 {
            return Err(DrawingError::InvalidData(
                "interaction sensitivity must be finite and > 0".to_owned(),
            ));
        }
        if !self.angle_snap_step_degrees.is_finite()
            || self.angle_snap_step_degrees <= 0.0
            || self.angle_snap_step_degrees > 180.0
        {
            return Err(DrawingError::InvalidData(
                "angle snap step must be finite and in (0, 180]".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_sensitivity_px() -> f64 {
    10.0
}

fn default_angle_snap_step_degrees() -> f64 {
    22.5
}

fn default_future_slot_allowance() -> u32 {
    500
}
