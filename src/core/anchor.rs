use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::{datetime_to_unix_seconds, decimal_to_f64};
use crate::core::{ChartScales, HorizontalAxis, PixelPoint, ToolId};
use crate::error::{DrawingError, DrawingResult};

/// Authoritative horizontal key of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnchorPosition {
    /// Unix seconds.
    Time(f64),
    /// Absolute bar index, `0` being the oldest bar.
    BarIndex(i64),
}

/// Data-space point owned by one drawing tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub position: AnchorPosition,
    /// Cached slot coordinate of `position`, refreshed whenever the position is
    /// written through the scales.
    pub slot_index: f64,
    pub price: f64,
    pub is_editing: bool,
    pub display_name: String,
    owner: Option<ToolId>,
}

impl Anchor {
    #[must_use]
    pub fn new(position: AnchorPosition, price: f64) -> Self {
        let slot_index = match position {
            AnchorPosition::BarIndex(index) => index as f64,
            AnchorPosition::Time(_) => f64::NAN,
        };
        Self {
            position,
            slot_index,
            price,
            is_editing: false,
            display_name: String::new(),
            owner: None,
        }
    }

    /// Unplaced anchor as created by tool construction.
    #[must_use]
    pub fn unplaced(display_name: impl Into<String>, axis: HorizontalAxis) -> Self {
        let position = match axis {
            HorizontalAxis::Time => AnchorPosition::Time(0.0),
            HorizontalAxis::BarIndex => AnchorPosition::BarIndex(0),
        };
        Self {
            position,
            slot_index: 0.0,
            price: 0.0,
            is_editing: true,
            display_name: display_name.into(),
            owner: None,
        }
    }

    pub fn from_decimal_time(time: DateTime<Utc>, price: Decimal) -> DrawingResult<Self> {
        Ok(Self::new(
            AnchorPosition::Time(datetime_to_unix_seconds(time)),
            decimal_to_f64(price, "price")?,
        ))
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn owner(&self) -> Option<ToolId> {
        self.owner
    }

    pub(crate) fn bind_owner(&mut self, owner: ToolId) {
        self.owner = Some(owner);
    }

    /// Recomputes `slot_index` from the authoritative position.
    pub fn refresh_slot(&mut self, scales: &dyn ChartScales) -> DrawingResult<()> {
        self.slot_index = match self.position {
            AnchorPosition::Time(time) => scales.time_to_slot(time)?,
            AnchorPosition::BarIndex(index) => index as f64,
        };
        Ok(())
    }

    /// Writes a slot coordinate back into the authoritative position, keeping
    /// the position kind.
    pub fn set_slot(&mut self, slot: f64, scales: &dyn ChartScales) -> DrawingResult<()> {
        if !slot.is_finite() {
            return Err(DrawingError::InvalidData("slot must be finite".to_owned()));
        }
        match self.position {
            AnchorPosition::Time(_) => {
                self.position = AnchorPosition::Time(scales.slot_to_time(slot)?);
                self.slot_index = slot;
            }
            AnchorPosition::BarIndex(_) => {
                let index = slot.round();
                self.position = AnchorPosition::BarIndex(index as i64);
                self.slot_index = index;
            }
        }
        Ok(())
    }

    /// Maps the anchor to panel pixels.
    pub fn project(&self, scales: &dyn ChartScales) -> DrawingResult<PixelPoint> {
        let x = match self.position {
            AnchorPosition::Time(time) => scales.time_to_x(time)?,
            AnchorPosition::BarIndex(index) => scales.slot_to_x(index as f64)?,
        };
        let y = scales.price_to_y(self.price)?;
        Ok(PixelPoint::new(x, y))
    }

    /// Inverse of [`Anchor::project`]: writes position, slot and price from a
    /// pixel point.
    pub fn unproject(&mut self, point: PixelPoint, scales: &dyn ChartScales) -> DrawingResult<()> {
        let slot = scales.x_to_slot(point.x)?;
        let price = scales.y_to_price(point.y)?;
        self.set_slot(slot, scales)?;
        self.price = price;
        Ok(())
    }

    /// Data values only; style, name, editing flag and owner stay untouched.
    #[must_use]
    pub fn data_values(&self) -> (AnchorPosition, f64, f64) {
        (self.position, self.slot_index, self.price)
    }
}

/// Copies time/bar index, slot and price from `src` into `dst`.
pub fn copy_data_values(src: &Anchor, dst: &mut Anchor) {
    dst.position = src.position;
    dst.slot_index = src.slot_index;
    dst.price = src.price;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LinearChartScales, PriceScale, TimeAxis, Viewport};

    fn scales() -> LinearChartScales {
        LinearChartScales::new(
            Viewport::new(1000, 500),
            (0.0, 100.0),
            PriceScale::new(0.0, 50.0).expect("price scale"),
        )
        .expect("scales")
        .with_time_axis(TimeAxis::Regular {
            origin_time: 1_000.0,
            bar_interval: 60.0,
        })
        .expect("time axis")
    }

    #[test]
    fn time_and_bar_index_anchors_project_to_same_pixel() {
        let scales = scales();
        let by_time = Anchor::new(AnchorPosition::Time(1_000.0 + 60.0 * 25.0), 25.0);
        let by_index = Anchor::new(AnchorPosition::BarIndex(25), 25.0);

        let a = by_time.project(&scales).expect("time projection");
        let b = by_index.project(&scales).expect("index projection");
        assert!((a.x - 250.0).abs() <= 1e-9);
        assert!((a.x - b.x).abs() <= 1e-9);
        assert!((a.y - 250.0).abs() <= 1e-9);
    }

    #[test]
    fn unproject_keeps_position_kind() {
        let scales = scales();
        let mut anchor = Anchor::new(AnchorPosition::BarIndex(3), 10.0);
        anchor
            .unproject(PixelPoint::new(412.0, 100.0), &scales)
            .expect("unproject");
        assert_eq!(anchor.position, AnchorPosition::BarIndex(41));
        assert_eq!(anchor.slot_index, 41.0);
        assert!((anchor.price - 40.0).abs() <= 1e-9);
    }

    #[test]
    fn decimal_time_anchor_is_keyed_in_unix_seconds() {
        let time = DateTime::from_timestamp(1_000 + 60 * 25 + 30, 0).expect("timestamp");
        let anchor = Anchor::from_decimal_time(time, Decimal::new(2_345, 2)).expect("decimal anchor");
        assert_eq!(anchor.position, AnchorPosition::Time(2_530.0));
        assert!((anchor.price - 23.45).abs() <= 1e-9);

        // Half a bar past slot 25.
        let point = anchor.project(&scales()).expect("projection");
        assert!((point.x - 255.0).abs() <= 1e-9);
        assert!((point.y - 265.5).abs() <= 1e-9);

        let millis = DateTime::from_timestamp(5, 250_000_000).expect("timestamp");
        let anchor = Anchor::from_decimal_time(millis, Decimal::ONE).expect("decimal anchor");
        assert_eq!(anchor.position, AnchorPosition::Time(5.25));
    }

    #[test]
    fn copy_data_values_leaves_identity_alone() {
        let src = Anchor::new(AnchorPosition::Time(5.0), 7.0).with_display_name("Start");
        let mut dst = Anchor::unplaced("End", HorizontalAxis::Time);
        copy_data_values(&src, &mut dst);
        assert_eq!(dst.position, AnchorPosition::Time(5.0));
        assert_eq!(dst.price, 7.0);
        assert_eq!(dst.display_name, "End");
        assert!(dst.is_editing);
    }
}
