use serde::{Deserialize, Serialize};

use crate::core::LinearScale;
use crate::error::{DrawingError, DrawingResult};

/// Mapping mode used by the price scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PriceScaleMode {
    /// Uniform spacing in raw price units.
    #[default]
    Linear,
    /// Uniform spacing in natural-log price units (all prices must be > 0).
    Log,
}

/// Price axis model mapped to an inverted Y pixel axis.
///
/// Higher prices map to smaller Y values unless `inverted` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScale {
    domain_start: f64,
    domain_end: f64,
    mode: PriceScaleMode,
    #[serde(default)]
    inverted: bool,
}

impl PriceScale {
    pub fn new(price_min: f64, price_max: f64) -> DrawingResult<Self> {
        Self::new_with_mode(price_min, price_max, PriceScaleMode::Linear)
    }

    pub fn new_with_mode(price_min: f64, price_max: f64, mode: PriceScaleMode) -> DrawingResult<Self> {
        let scale = Self {
            domain_start: price_min.min(price_max),
            domain_end: price_min.max(price_max),
            mode,
            inverted: false,
        };
        scale.transformed_linear()?;
        Ok(scale)
    }

    #[must_use]
    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    #[must_use]
    pub fn mode(self) -> PriceScaleMode {
        self.mode
    }

    #[must_use]
    pub fn is_inverted(self) -> bool {
        self.inverted
    }

    pub fn price_to_pixel(self, price: f64, height_px: f64) -> DrawingResult<f64> {
        let transformed = self.transform(price)?;
        let normalized = self
            .transformed_linear()?
            .domain_to_pixel(transformed, height_px)?;
        if self.inverted {
            Ok(normalized)
        } else {
            Ok(height_px - normalized)
        }
    }

    pub fn pixel_to_price(self, pixel: f64, height_px: f64) -> DrawingResult<f64> {
        if !pixel.is_finite() {
            return Err(DrawingError::InvalidData("pixel must be finite".to_owned()));
        }
        let inv_pixel = if self.inverted {
            pixel
        } else {
            height_px - pixel
        };
        let transformed = self
            .transformed_linear()?
            .pixel_to_domain(inv_pixel, height_px)?;
        Ok(self.untransform(transformed))
    }

    fn transform(self, price: f64) -> DrawingResult<f64> {
        if !price.is_finite() {
            return Err(DrawingError::InvalidData("price must be finite".to_owned()));
        }
        match self.mode {
            PriceScaleMode::Linear => Ok(price),
            PriceScaleMode::Log => {
                if price <= 0.0 {
                    return Err(DrawingError::InvalidData(
                        "log price scale requires prices > 0".to_owned(),
                    ));
                }
                Ok(price.ln())
            }
        }
    }

    fn untransform(self, transformed: f64) -> f64 {
        match self.mode {
            PriceScaleMode::Linear => transformed,
            PriceScaleMode::Log => transformed.exp(),
        }
    }

    fn transformed_linear(self) -> DrawingResult<LinearScale> {
        LinearScale::new(self.transform(self.domain_start)?, self.transform(self.domain_end)?)
    }
}
