use serde::{Deserialize, Serialize};

use crate::core::Viewport;
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::InteractionConfig;

/// Public engine bootstrap configuration.
///
/// Serializable so hosts can persist drawing preferences next to their own
/// chart setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingEngineConfig {
    pub viewport: Viewport,
    #[serde(default)]
    pub interaction: InteractionConfig,
    /// Reserved tag prefix marking tools shared across charts of one
    /// instrument.
    #[serde(default = "default_global_tag_prefix")]
    pub global_tag_prefix: String,
    /// Pixel tolerance of the `Equal` alert operator.
    #[serde(default = "default_alert_equal_tolerance_px")]
    pub alert_equal_tolerance_px: f64,
}

impl DrawingEngineConfig {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            interaction: InteractionConfig::default(),
            global_tag_prefix: default_global_tag_prefix(),
            alert_equal_tolerance_px: default_alert_equal_tolerance_px(),
        }
    }

    #[must_use]
    pub fn with_interaction(mut self, interaction: InteractionConfig) -> Self {
        self.interaction = interaction;
        self
    }

    /// Sets hit-testing radius in pixels.
    #[must_use]
    pub fn with_sensitivity_px(mut self, sensitivity_px: f64) -> Self {
        self.interaction.sensitivity_px = sensitivity_px;
        self
    }

    #[must_use]
    pub fn with_angle_snap_step_degrees(mut self, step: f64) -> Self {
        self.interaction.angle_snap_step_degrees = step;
        self
    }

    /// Sets how many slots past the last bar anchors may occupy.
    #[must_use]
    pub fn with_future_slot_allowance(mut self, slots: u32) -> Self {
        self.interaction.future_slot_allowance = slots;
        self
    }

    #[must_use]
    pub fn with_global_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.global_tag_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_alert_equal_tolerance_px(mut self, tolerance: f64) -> Self {
        self.alert_equal_tolerance_px = tolerance;
        self
    }

    pub fn validate(&self) -> DrawingResult<()> {
        if !self.viewport.is_valid() {
            return Err(DrawingError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        self.interaction.validate()?;
        if self.global_tag_prefix.is_empty() {
            return Err(DrawingError::InvalidData(
                "global tag prefix must not be empty".to_owned(),
            ));
        }
        if !self.alert_equal_tolerance_px.is_finite() || self.alert_equal_tolerance_px < 0.0 {
            return Err(DrawingError::InvalidData(
                "alert equal tolerance must be finite and >= 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Serializes config to pretty JSON.
    pub fn to_json_pretty(&self) -> DrawingResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DrawingError::Persistence(format!("failed to serialize config: {e}")))
    }

    /// Deserializes and validates config from JSON.
    pub fn from_json_str(input: &str) -> DrawingResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| DrawingError::Persistence(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

fn default_global_tag_prefix() -> String {
    "@".to_owned()
}

fn default_alert_equal_tolerance_px() -> f64 {
    0.5
}
