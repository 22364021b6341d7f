//! Stroke and fill value objects.
//!
//! All types here are `Copy`: levels and tools hold their own copies, so
//! editing one never leaks into another after a clone.

use serde::{Deserialize, Serialize};

use crate::error::{DrawingError, DrawingResult};

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> DrawingResult<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return Err(DrawingError::InvalidData(format!(
                "color `{hex}` must be #rrggbb or #rrggbbaa"
            )));
        }
        let channel = |offset: usize| -> DrawingResult<f64> {
            u8::from_str_radix(&digits[offset..offset + 2], 16)
                .map(|value| f64::from(value) / 255.0)
                .map_err(|_| DrawingError::InvalidData(format!("color `{hex}` is not hex")))
        };
        let alpha = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    #[must_use]
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    pub fn validate(self) -> DrawingResult<()> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DrawingError::InvalidData(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DashStyle {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

/// Line appearance. `opacity` is a percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    #[serde(default)]
    pub dash: DashStyle,
    #[serde(default = "full_opacity")]
    pub opacity: u8,
}

impl Stroke {
    #[must_use]
    pub const fn new(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: DashStyle::Solid,
            opacity: 100,
        }
    }

    #[must_use]
    pub fn with_dash(mut self, dash: DashStyle) -> Self {
        self.dash = dash;
        self
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity.min(100);
        self
    }

    /// Color with `opacity` folded into its alpha channel.
    #[must_use]
    pub fn effective_color(self) -> Color {
        self.color
            .with_alpha(self.color.alpha * f64::from(self.opacity.min(100)) / 100.0)
    }

    pub fn validate(self) -> DrawingResult<()> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(DrawingError::InvalidData(
                "stroke width must be finite and > 0".to_owned(),
            ));
        }
        if self.opacity > 100 {
            return Err(DrawingError::InvalidData(
                "stroke opacity must be in [0, 100]".to_owned(),
            ));
        }
        self.color.validate()
    }
}

impl Default for Stroke {
    fn default() -> Self {
        Self::new(Color::rgb(0.16, 0.38, 1.0), 1.0)
    }
}

/// Region fill. `opacity` is a percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaFill {
    pub color: Color,
    #[serde(default = "default_area_opacity")]
    pub opacity: u8,
}

impl AreaFill {
    #[must_use]
    pub const fn new(color: Color, opacity: u8) -> Self {
        Self { color, opacity }
    }

    #[must_use]
    pub fn effective_color(self) -> Color {
        self.color
            .with_alpha(self.color.alpha * f64::from(self.opacity.min(100)) / 100.0)
    }

    #[must_use]
    pub fn is_visible(self) -> bool {
        self.opacity > 0 && self.color.alpha > 0.0
    }
}

/// Complete appearance of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolStyle {
    pub stroke: Stroke,
    #[serde(default)]
    pub area: Option<AreaFill>,
}

impl ToolStyle {
    #[must_use]
    pub fn new(stroke: Stroke) -> Self {
        Self { stroke, area: None }
    }

    #[must_use]
    pub fn with_area(mut self, area: AreaFill) -> Self {
        self.area = Some(area);
        self
    }

    #[must_use]
    pub fn has_visible_area(self) -> bool {
        self.area.is_some_and(AreaFill::is_visible)
    }

    pub fn validate(self) -> DrawingResult<()> {
        self.stroke.validate()?;
        if let Some(area) = self.area {
            if area.opacity > 100 {
                return Err(DrawingError::InvalidData(
                    "area opacity must be in [0, 100]".to_owned(),
                ));
            }
            area.color.validate()?;
        }
        Ok(())
    }
}

fn full_opacity() -> u8 {
    100
}

fn default_area_opacity() -> u8 {
    40
}
