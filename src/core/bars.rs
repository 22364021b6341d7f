use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::{datetime_to_unix_seconds, decimal_to_f64};
use crate::error::{DrawingError, DrawingResult};

/// Canonical OHLC bar supplied by the host data feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcBar {
    /// Builds a validated OHLC bar from raw floating values.
    ///
    /// Invariants:
    /// - all values are finite
    /// - `low <= high`
    /// - `open` and `close` are within `[low, high]`
    pub fn new(time: f64, open: f64, high: f64, low: f64, close: f64) -> DrawingResult<Self> {
        if !time.is_finite()
            || !open.is_finite()
            || !high.is_finite()
            || !low.is_finite()
            || !close.is_finite()
        {
            return Err(DrawingError::InvalidData(
                "ohlc values must be finite".to_owned(),
            ));
        }

        if low > high {
            return Err(DrawingError::InvalidData(
                "ohlc low must be <= high".to_owned(),
            ));
        }

        if open < low || open > high || close < low || close > high {
            return Err(DrawingError::InvalidData(
                "ohlc open/close must be within low/high range".to_owned(),
            ));
        }

        Ok(Self {
            time,
            open,
            high,
            low,
            close,
        })
    }

    /// Converts strongly-typed temporal/decimal input into a validated OHLC bar.
    pub fn from_decimal_time(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> DrawingResult<Self> {
        Self::new(
            datetime_to_unix_seconds(time),
            decimal_to_f64(open, "open")?,
            decimal_to_f64(high, "high")?,
            decimal_to_f64(low, "low")?,
            decimal_to_f64(close, "close")?,
        )
    }

    #[must_use]
    pub fn price(self, selector: PriceSelector) -> f64 {
        match selector {
            PriceSelector::Close => self.close,
            PriceSelector::Open => self.open,
            PriceSelector::High => self.high,
            PriceSelector::Low => self.low,
            PriceSelector::Median => (self.high + self.low) / 2.0,
            PriceSelector::Typical => (self.high + self.low + self.close) / 3.0,
            PriceSelector::Weighted => (self.high + self.low + 2.0 * self.close) / 4.0,
        }
    }
}

/// Which price of a bar feeds a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PriceSelector {
    #[default]
    Close,
    Open,
    High,
    Low,
    Median,
    Typical,
    Weighted,
}

/// Read access to the host's OHLC series, addressed by bar index.
///
/// Index `0` is the oldest bar.
pub trait BarSource {
    fn bar_count(&self) -> usize;

    fn bar(&self, index: usize) -> Option<OhlcBar>;

    /// Index of the bar whose time is closest to `time`.
    fn index_of_time(&self, time: f64) -> Option<usize> {
        if !time.is_finite() {
            return None;
        }
        (0..self.bar_count())
            .filter_map(|index| self.bar(index).map(|bar| (index, bar.time)))
            .min_by_key(|(_, bar_time)| OrderedFloat((bar_time - time).abs()))
            .map(|(index, _)| index)
    }

    #[must_use]
    fn last_index(&self) -> Option<usize> {
        self.bar_count().checked_sub(1)
    }
}

impl BarSource for [OhlcBar] {
    fn bar_count(&self) -> usize {
        self.len()
    }

    fn bar(&self, index: usize) -> Option<OhlcBar> {
        self.get(index).copied()
    }

    fn index_of_time(&self, time: f64) -> Option<usize> {
        if !time.is_finite() || self.is_empty() {
            return None;
        }
        // Bars are time-ordered, so the nearest bar is adjacent to the partition point.
        let upper = self.partition_point(|bar| bar.time < time);
        let candidates = [upper.checked_sub(1), (upper < self.len()).then_some(upper)];
        candidates
            .into_iter()
            .flatten()
            .min_by_key(|index| OrderedFloat((self[*index].time - time).abs()))
    }
}

impl BarSource for Vec<OhlcBar> {
    fn bar_count(&self) -> usize {
        self.len()
    }

    fn bar(&self, index: usize) -> Option<OhlcBar> {
        self.get(index).copied()
    }

    fn index_of_time(&self, time: f64) -> Option<usize> {
        self.as_slice().index_of_time(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).expect("timestamp")
    }

    #[test]
    fn decimal_bar_converts_time_and_prices() {
        let bar = OhlcBar::from_decimal_time(
            at(1_700_000_060),
            Decimal::new(10_050, 2),
            Decimal::new(10_200, 2),
            Decimal::new(9_975, 2),
            Decimal::new(10_125, 2),
        )
        .expect("decimal bar");
        assert_eq!(bar.time, 1_700_000_060.0);
        assert!((bar.open - 100.5).abs() <= 1e-9);
        assert!((bar.high - 102.0).abs() <= 1e-9);
        assert!((bar.low - 99.75).abs() <= 1e-9);
        assert!((bar.close - 101.25).abs() <= 1e-9);
        assert!((bar.price(PriceSelector::Median) - 100.875).abs() <= 1e-9);
    }

    #[test]
    fn decimal_bar_rejects_inconsistent_ohlc() {
        let inverted = OhlcBar::from_decimal_time(
            at(0),
            Decimal::ONE,
            Decimal::ONE,
            Decimal::from(2),
            Decimal::ONE,
        )
        .expect_err("low above high");
        assert!(matches!(inverted, DrawingError::InvalidData(_)));

        let outside = OhlcBar::from_decimal_time(
            at(0),
            Decimal::from(5),
            Decimal::from(2),
            Decimal::ONE,
            Decimal::ONE,
        )
        .expect_err("open above high");
        assert!(matches!(outside, DrawingError::InvalidData(_)));
    }
}
