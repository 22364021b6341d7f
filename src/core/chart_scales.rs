use serde::{Deserialize, Serialize};

use crate::core::{BarSource, LinearScale, PixelRect, PriceScale, Viewport};
use crate::error::{DrawingError, DrawingResult};

/// How the host chart addresses its horizontal axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAxis {
    /// Anchors are keyed by timestamp.
    Time,
    /// Anchors are keyed by bar index (non time-linear spacing).
    BarIndex,
}

/// Host-provided mapping between data space and panel pixels.
///
/// Horizontal positions go through a logical *slot* coordinate: slot `n` is the
/// center of bar `n`, fractional slots lie between bars and slots past the last
/// bar address future space.
pub trait ChartScales {
    fn bounds(&self) -> PixelRect;

    fn horizontal_axis(&self) -> HorizontalAxis;

    fn slot_to_x(&self, slot: f64) -> DrawingResult<f64>;

    fn x_to_slot(&self, x: f64) -> DrawingResult<f64>;

    fn time_to_slot(&self, time: f64) -> DrawingResult<f64>;

    fn slot_to_time(&self, slot: f64) -> DrawingResult<f64>;

    fn price_to_y(&self, price: f64) -> DrawingResult<f64>;

    fn y_to_price(&self, y: f64) -> DrawingResult<f64>;

    /// `false` when the price axis is flipped so higher prices sit lower on
    /// screen.
    fn price_increases_upward(&self) -> bool {
        true
    }

    fn time_to_x(&self, time: f64) -> DrawingResult<f64> {
        self.slot_to_x(self.time_to_slot(time)?)
    }

    /// Slot range covered by the panel's horizontal extent.
    fn visible_slot_range(&self) -> DrawingResult<(f64, f64)> {
        let bounds = self.bounds();
        let start = self.x_to_slot(bounds.left)?;
        let end = self.x_to_slot(bounds.right)?;
        Ok((start.min(end), start.max(end)))
    }
}

/// Time axis backing [`LinearChartScales`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeAxis {
    /// Bars are evenly spaced in time.
    Regular { origin_time: f64, bar_interval: f64 },
    /// Bar times in ascending order; gaps (sessions, weekends) are allowed.
    Irregular(Vec<f64>),
}

impl TimeAxis {
    fn validate(&self) -> DrawingResult<()> {
        match self {
            Self::Regular {
                origin_time,
                bar_interval,
            } => {
                if !origin_time.is_finite() || !bar_interval.is_finite() || *bar_interval <= 0.0 {
                    return Err(DrawingError::InvalidData(
                        "regular time axis requires finite origin and interval > 0".to_owned(),
                    ));
                }
            }
            Self::Irregular(times) => {
                if times.is_empty() {
                    return Err(DrawingError::InvalidData(
                        "irregular time axis cannot be empty".to_owned(),
                    ));
                }
                if times.iter().any(|time| !time.is_finite())
                    || times.windows(2).any(|pair| pair[1] <= pair[0])
                {
                    return Err(DrawingError::InvalidData(
                        "irregular time axis must be finite and strictly ascending".to_owned(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn time_to_slot(&self, time: f64) -> f64 {
        match self {
            Self::Regular {
                origin_time,
                bar_interval,
            } => (time - origin_time) / bar_interval,
            Self::Irregular(times) => {
                if times.len() == 1 {
                    return 0.0;
                }
                let last = times.len() - 1;
                let upper = times.partition_point(|t| *t < time).clamp(1, last);
                let (t0, t1) = (times[upper - 1], times[upper]);
                (upper - 1) as f64 + (time - t0) / (t1 - t0)
            }
        }
    }

    fn slot_to_time(&self, slot: f64) -> f64 {
        match self {
            Self::Regular {
                origin_time,
                bar_interval,
            } => origin_time + slot * bar_interval,
            Self::Irregular(times) => {
                if times.len() == 1 {
                    return times[0];
                }
                let last = times.len() - 1;
                let lower = (slot.floor().max(0.0) as usize).min(last - 1);
                let (t0, t1) = (times[lower], times[lower + 1]);
                t0 + (slot - lower as f64) * (t1 - t0)
            }
        }
    }
}

/// Straightforward [`ChartScales`] implementation: linear slot axis, linear or
/// log price axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearChartScales {
    viewport: Viewport,
    slot_scale: LinearScale,
    price_scale: PriceScale,
    time_axis: Option<TimeAxis>,
}

impl LinearChartScales {
    /// `visible_slots` is the slot range spanned by the panel width.
    pub fn new(
        viewport: Viewport,
        visible_slots: (f64, f64),
        price_scale: PriceScale,
    ) -> DrawingResult<Self> {
        if !viewport.is_valid() {
            return Err(DrawingError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(Self {
            viewport,
            slot_scale: LinearScale::new(visible_slots.0, visible_slots.1)?,
            price_scale,
            time_axis: None,
        })
    }

    pub fn with_time_axis(mut self, time_axis: TimeAxis) -> DrawingResult<Self> {
        time_axis.validate()?;
        self.time_axis = Some(time_axis);
        Ok(self)
    }

    /// Builds a time axis from the bars' own timestamps.
    pub fn with_bar_times<B: BarSource + ?Sized>(self, bars: &B) -> DrawingResult<Self> {
        let times = (0..bars.bar_count())
            .filter_map(|index| bars.bar(index).map(|bar| bar.time))
            .collect();
        self.with_time_axis(TimeAxis::Irregular(times))
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn price_scale(&self) -> PriceScale {
        self.price_scale
    }

    pub fn set_visible_slots(&mut self, start: f64, end: f64) -> DrawingResult<()> {
        self.slot_scale = LinearScale::new(start, end)?;
        Ok(())
    }

    pub fn set_price_scale(&mut self, price_scale: PriceScale) {
        self.price_scale = price_scale;
    }

    fn width(&self) -> f64 {
        f64::from(self.viewport.width)
    }

    fn height(&self) -> f64 {
        f64::from(self.viewport.height)
    }

    fn time_axis(&self) -> DrawingResult<&TimeAxis> {
        self.time_axis.as_ref().ok_or_else(|| {
            DrawingError::InvalidData("chart has no time axis; anchors must use bar indices".to_owned())
        })
    }
}

impl ChartScales for LinearChartScales {
    fn bounds(&self) -> PixelRect {
        self.viewport.bounds()
    }

    fn horizontal_axis(&self) -> HorizontalAxis {
        if self.time_axis.is_some() {
            HorizontalAxis::Time
        } else {
            HorizontalAxis::BarIndex
        }
    }

    fn slot_to_x(&self, slot: f64) -> DrawingResult<f64> {
        self.slot_scale.domain_to_pixel(slot, self.width())
    }

    fn x_to_slot(&self, x: f64) -> DrawingResult<f64> {
        self.slot_scale.pixel_to_domain(x, self.width())
    }

    fn time_to_slot(&self, time: f64) -> DrawingResult<f64> {
        if !time.is_finite() {
            return Err(DrawingError::InvalidData("time must be finite".to_owned()));
        }
        Ok(self.time_axis()?.time_to_slot(time))
    }

    fn slot_to_time(&self, slot: f64) -> DrawingResult<f64> {
        if !slot.is_finite() {
            return Err(DrawingError::InvalidData("slot must be finite".to_owned()));
        }
        Ok(self.time_axis()?.slot_to_time(slot))
    }

    fn price_increases_upward(&self) -> bool {
        !self.price_scale.is_inverted()
    }

    fn price_to_y(&self, price: f64) -> DrawingResult<f64> {
        self.price_scale.price_to_pixel(price, self.height())
    }

    fn y_to_price(&self, y: f64) -> DrawingResult<f64> {
        self.price_scale.pixel_to_price(y, self.height())
    }
}

/// Everything a tool query needs from the host chart: pixel mapping plus bars.
#[derive(Clone, Copy)]
pub struct ChartContext<'a> {
    pub scales: &'a dyn ChartScales,
    pub bars: &'a dyn BarSource,
}

impl<'a> ChartContext<'a> {
    #[must_use]
    pub fn new(scales: &'a dyn ChartScales, bars: &'a dyn BarSource) -> Self {
        Self { scales, bars }
    }
}
