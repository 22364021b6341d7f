//! Edge- and level-triggered alert evaluation over time-ordered samples.
//!
//! Edge-triggered operators (`Cross*`) compare the predicate's truth value on
//! the two most recent samples. Level-triggered operators only look at the
//! most recent sample.

use serde::{Deserialize, Serialize};

use crate::core::PixelPoint;
use crate::error::{DrawingError, DrawingResult};
use crate::geometry::LineSide;

/// One observed value of the alert source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertSample {
    /// Unix seconds.
    pub time: f64,
    pub value: f64,
}

impl AlertSample {
    #[must_use]
    pub const fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }

    /// Synthetic constant-value series, used when an alert compares a tool
    /// against a fixed price instead of a live stream.
    #[must_use]
    pub fn static_series(value: f64, times: impl IntoIterator<Item = f64>) -> Vec<Self> {
        times.into_iter().map(|time| Self::new(time, value)).collect()
    }
}

/// `true` iff `predicate` differs between the last two samples.
///
/// Sequences shorter than two samples never cross.
pub fn did_predicate_cross<T>(samples: &[T], predicate: impl Fn(&T) -> bool) -> bool {
    match samples {
        [.., previous, latest] => predicate(previous) != predicate(latest),
        _ => false,
    }
}

/// Level-triggered check of the most recent sample.
pub fn predicate_holds<T>(samples: &[T], predicate: impl Fn(&T) -> bool) -> bool {
    samples.last().is_some_and(predicate)
}

/// Incremental form of [`did_predicate_cross`] for streaming sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrossingTracker {
    last: Option<bool>,
}

impl CrossingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the predicate value for a new sample and reports whether it
    /// differs from the previous one. The first observation never crosses.
    pub fn observe(&mut self, truth: bool) -> bool {
        let crossed = self.last.is_some_and(|previous| previous != truth);
        self.last = Some(truth);
        crossed
    }

    #[must_use]
    pub fn last(&self) -> Option<bool> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOperator {
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    CrossAbove,
    CrossBelow,
    Inside,
    Outside,
    CrossInside,
    CrossOutside,
}

impl ConditionOperator {
    pub const LINE: &'static [Self] = &[
        Self::Greater,
        Self::GreaterEqual,
        Self::Less,
        Self::LessEqual,
        Self::Equal,
        Self::NotEqual,
        Self::CrossAbove,
        Self::CrossBelow,
    ];

    pub const REGION: &'static [Self] = &[
        Self::Inside,
        Self::Outside,
        Self::CrossInside,
        Self::CrossOutside,
    ];

    #[must_use]
    pub fn is_edge_triggered(self) -> bool {
        matches!(
            self,
            Self::CrossAbove | Self::CrossBelow | Self::CrossInside | Self::CrossOutside
        )
    }
}

/// Which part of a tool an alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertTarget {
    /// The tool's main line (lines, rays, marker price).
    Line,
    /// A price level by position in the tool's level list.
    Level(usize),
    RegressionUpper,
    RegressionMiddle,
    RegressionLower,
    ChannelUpper,
    ChannelLower,
    /// The enclosed region of a shape.
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertCondition {
    pub target: AlertTarget,
    pub operator: ConditionOperator,
}

impl AlertCondition {
    #[must_use]
    pub const fn new(target: AlertTarget, operator: ConditionOperator) -> Self {
        Self { target, operator }
    }
}

/// An alertable target with its display name and supported operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertConditionItem {
    pub target: AlertTarget,
    pub name: String,
    pub operators: &'static [ConditionOperator],
}

impl AlertConditionItem {
    #[must_use]
    pub fn supports(&self, operator: ConditionOperator) -> bool {
        self.operators.contains(&operator)
    }
}

/// Evaluates a line operator over projected samples.
///
/// `side` returns `None` for samples outside the line's horizontal extent;
/// such samples satisfy no predicate. `is_equal` decides `Equal` with the
/// caller's tolerance.
pub fn evaluate_line_condition(
    operator: ConditionOperator,
    samples: &[PixelPoint],
    side: impl Fn(PixelPoint) -> Option<LineSide>,
    is_equal: impl Fn(PixelPoint) -> bool,
) -> DrawingResult<bool> {
    let above = |point: &PixelPoint| side(*point) == Some(LineSide::LeftOrAbove);
    let below = |point: &PixelPoint| side(*point) == Some(LineSide::RightOrBelow);
    let in_extent = |point: &PixelPoint| side(*point).is_some();
    let equal = |point: &PixelPoint| in_extent(point) && is_equal(*point);

    let result = match operator {
        ConditionOperator::Greater => predicate_holds(samples, |p| above(p) && !equal(p)),
        ConditionOperator::GreaterEqual => predicate_holds(samples, |p| above(p) || equal(p)),
        ConditionOperator::Less => predicate_holds(samples, |p| below(p) && !equal(p)),
        ConditionOperator::LessEqual => predicate_holds(samples, |p| below(p) || equal(p)),
        ConditionOperator::Equal => predicate_holds(samples, equal),
        ConditionOperator::NotEqual => predicate_holds(samples, |p| in_extent(p) && !equal(p)),
        ConditionOperator::CrossAbove => {
            did_predicate_cross(samples, above) && predicate_holds(samples, above)
        }
        ConditionOperator::CrossBelow => {
            did_predicate_cross(samples, below) && predicate_holds(samples, below)
        }
        ConditionOperator::Inside
        | ConditionOperator::Outside
        | ConditionOperator::CrossInside
        | ConditionOperator::CrossOutside => {
            return Err(unsupported(operator, "line"));
        }
    };
    Ok(result)
}

/// Evaluates a region operator over projected samples.
pub fn evaluate_region_condition(
    operator: ConditionOperator,
    samples: &[PixelPoint],
    inside: impl Fn(PixelPoint) -> bool,
) -> DrawingResult<bool> {
    let is_inside = |point: &PixelPoint| inside(*point);
    let is_outside = |point: &PixelPoint| !inside(*point);

    let result = match operator {
        ConditionOperator::Inside => predicate_holds(samples, is_inside),
        ConditionOperator::Outside => predicate_holds(samples, is_outside),
        ConditionOperator::CrossInside => {
            did_predicate_cross(samples, is_inside) && predicate_holds(samples, is_inside)
        }
        ConditionOperator::CrossOutside => {
            did_predicate_cross(samples, is_inside) && predicate_holds(samples, is_outside)
        }
        _ => return Err(unsupported(operator, "region")),
    };
    Ok(result)
}

fn unsupported(operator: ConditionOperator, target_kind: &str) -> DrawingError {
    DrawingError::argument(
        "condition",
        format!("{operator:?} is not supported by {target_kind} targets"),
    )
}
