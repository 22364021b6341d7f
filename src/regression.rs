//! Least-squares regression channel over an inclusive bar range.

use serde::{Deserialize, Serialize};

use crate::core::{BarSource, PriceSelector};
use crate::error::{DrawingError, DrawingResult};

/// How the upper and lower channel lines are offset from the regression line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChannelMode {
    /// Offset by `sigma * multiplier`; multipliers may be zero or negative.
    StandardDeviation {
        upper_multiplier: f64,
        lower_multiplier: f64,
    },
    /// Parallel lines through the most extreme high and low of the range.
    Segment,
}

impl Default for ChannelMode {
    fn default() -> Self {
        Self::StandardDeviation {
            upper_multiplier: 2.0,
            lower_multiplier: 2.0,
        }
    }
}

/// Prices of one channel line at the range's start and end bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePair {
    pub start: f64,
    pub end: f64,
}

impl PricePair {
    #[must_use]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    #[must_use]
    fn swapped(self) -> Self {
        Self::new(self.end, self.start)
    }

    /// Linear interpolation at `fraction` of the way from start to end.
    #[must_use]
    pub fn at(self, fraction: f64) -> f64 {
        self.start + (self.end - self.start) * fraction
    }
}

/// Regression output, oriented like the caller's range: `start_index` may be
/// greater than `end_index`, and every pair's `start` belongs to
/// `start_index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionChannel {
    pub start_index: usize,
    pub end_index: usize,
    pub middle: PricePair,
    pub upper: PricePair,
    pub lower: PricePair,
    /// Price change per bar, measured from the lower index upwards.
    pub slope: f64,
    /// Fitted price at the lower index.
    pub intercept: f64,
    /// Population standard deviation of the absolute residuals.
    pub std_dev: f64,
}

pub fn compute_regression_channel<B: BarSource + ?Sized>(
    bars: &B,
    start_index: usize,
    end_index: usize,
    selector: PriceSelector,
    mode: ChannelMode,
) -> DrawingResult<RegressionChannel> {
    if let ChannelMode::StandardDeviation {
        upper_multiplier,
        lower_multiplier,
    } = mode
    {
        if !upper_multiplier.is_finite() || !lower_multiplier.is_finite() {
            return Err(DrawingError::InvalidData(
                "regression multipliers must be finite".to_owned(),
            ));
        }
    }

    let lo = start_index.min(end_index);
    let hi = start_index.max(end_index);
    if hi >= bars.bar_count() {
        return Err(DrawingError::InvalidData(format!(
            "regression range [{lo}, {hi}] exceeds {} available bars",
            bars.bar_count()
        )));
    }

    let window = (lo..=hi)
        .map(|index| {
            bars.bar(index).ok_or_else(|| {
                DrawingError::InvalidData(format!("bar {index} is not available"))
            })
        })
        .collect::<DrawingResult<Vec<_>>>()?;
    let prices: Vec<f64> = window.iter().map(|bar| bar.price(selector)).collect();

    if prices.len() == 1 {
        let price = PricePair::new(prices[0], prices[0]);
        return Ok(RegressionChannel {
            start_index,
            end_index,
            middle: price,
            upper: price,
            lower: price,
            slope: 0.0,
            intercept: prices[0],
            std_dev: 0.0,
        });
    }

    let (slope, intercept) = least_squares(&prices);
    let fitted = |local: usize| intercept + slope * local as f64;
    let std_dev = residual_std_dev(&prices, fitted);

    let (upper_offset, lower_offset) = match mode {
        ChannelMode::StandardDeviation {
            upper_multiplier,
            lower_multiplier,
        } => (std_dev * upper_multiplier, -std_dev * lower_multiplier),
        ChannelMode::Segment => {
            let upper = window
                .iter()
                .enumerate()
                .map(|(local, bar)| bar.high - fitted(local))
                .fold(f64::NEG_INFINITY, f64::max);
            let lower = window
                .iter()
                .enumerate()
                .map(|(local, bar)| bar.low - fitted(local))
                .fold(f64::INFINITY, f64::min);
            (upper, lower)
        }
    };

    let last_local = prices.len() - 1;
    let middle = PricePair::new(fitted(0), fitted(last_local));
    let upper = PricePair::new(middle.start + upper_offset, middle.end + upper_offset);
    let lower = PricePair::new(middle.start + lower_offset, middle.end + lower_offset);

    let reversed = start_index > end_index;
    let orient = |pair: PricePair| if reversed { pair.swapped() } else { pair };

    Ok(RegressionChannel {
        start_index,
        end_index,
        middle: orient(middle),
        upper: orient(upper),
        lower: orient(lower),
        slope,
        intercept,
        std_dev,
    })
}

/// Ordinary least squares over `(local_index, price)`.
fn least_squares(prices: &[f64]) -> (f64, f64) {
    let n = prices.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    for (local, price) in prices.iter().enumerate() {
        let x = local as f64;
        sum_x += x;
        sum_y += price;
        sum_xy += x * price;
        sum_x2 += x * x;
    }
    let denominator = n * sum_x2 - sum_x * sum_x;
    let slope = if denominator == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    };
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

/// Two-pass population standard deviation of `|price - fitted|`.
fn residual_std_dev(prices: &[f64], fitted: impl Fn(usize) -> f64) -> f64 {
    let residuals: Vec<f64> = prices
        .iter()
        .enumerate()
        .map(|(local, price)| (price - fitted(local)).abs())
        .collect();
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let sum_sq = residuals
        .iter()
        .map(|residual| (residual - mean).powi(2))
        .sum::<f64>();
    (sum_sq / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OhlcBar;

    #[test]
    fn perfect_trend_has_zero_deviation() {
        let bars: Vec<OhlcBar> = (0..5)
            .map(|i| {
                let close = 10.0 + 2.0 * i as f64;
                OhlcBar::new(i as f64, close, close + 1.0, close - 1.0, close).expect("bar")
            })
            .collect();
        let channel =
            compute_regression_channel(&bars, 0, 4, PriceSelector::Close, ChannelMode::default())
                .expect("channel");
        assert!((channel.slope - 2.0).abs() <= 1e-12);
        assert!((channel.intercept - 10.0).abs() <= 1e-12);
        assert!(channel.std_dev.abs() <= 1e-12);
        assert!((channel.middle.end - 18.0).abs() <= 1e-12);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let bars = vec![OhlcBar::new(0.0, 1.0, 1.0, 1.0, 1.0).expect("bar")];
        assert!(
            compute_regression_channel(&bars, 0, 1, PriceSelector::Close, ChannelMode::Segment)
                .is_err()
        );
    }
}
