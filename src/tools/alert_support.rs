use crate::alerts::{
    AlertCondition, AlertConditionItem, AlertSample, AlertTarget, ConditionOperator,
    evaluate_line_condition, evaluate_region_condition,
};
use crate::core::{ChartContext, HorizontalAxis, PixelPoint};
use crate::error::{DrawingError, DrawingResult};
use crate::geometry::{LineSide, point_line_side, signed_distance_to_line};

use super::{DrawingTool, ToolKind};

impl DrawingTool {
    /// Alertable targets of this tool with their supported operators.
    #[must_use]
    pub fn alert_conditions(&self) -> Vec<AlertConditionItem> {
        let line = |target, name: &str| AlertConditionItem {
            target,
            name: name.to_owned(),
            operators: ConditionOperator::LINE,
        };
        match self.kind() {
            ToolKind::VerticalLine | ToolKind::Text(_) => Vec::new(),
            ToolKind::HorizontalLine
            | ToolKind::Line
            | ToolKind::Ray
            | ToolKind::ExtendedLine
            | ToolKind::ArrowLine
            | ToolKind::Marker(_) => vec![line(AlertTarget::Line, self.kind().name())],
            ToolKind::Rectangle | ToolKind::Ellipse | ToolKind::Triangle => {
                vec![AlertConditionItem {
                    target: AlertTarget::Area,
                    name: self.kind().name().to_owned(),
                    operators: ConditionOperator::REGION,
                }]
            }
            ToolKind::ParallelChannel => vec![
                line(AlertTarget::ChannelUpper, "Upper"),
                line(AlertTarget::ChannelLower, "Lower"),
            ],
            ToolKind::FibonacciRetracement(params) | ToolKind::FibonacciExtension(params) => {
                params
                    .levels
                    .iter()
                    .enumerate()
                    .filter(|(_, level)| level.is_visible)
                    .map(|(index, level)| line(AlertTarget::Level(index), &level.display_name()))
                    .collect()
            }
            ToolKind::RegressionChannel(_) => vec![
                line(AlertTarget::RegressionUpper, "Upper channel"),
                line(AlertTarget::RegressionMiddle, "Regression"),
                line(AlertTarget::RegressionLower, "Lower channel"),
            ],
        }
    }

    /// Evaluates `condition` against the two most recent `samples`.
    ///
    /// Read-only over anchors and levels. Line targets only match samples
    /// inside their horizontal extent; `Equal` uses `equal_tolerance_px`.
    pub fn evaluate_alert(
        &self,
        condition: AlertCondition,
        samples: &[AlertSample],
        ctx: ChartContext<'_>,
        equal_tolerance_px: f64,
    ) -> DrawingResult<bool> {
        let supported = self
            .alert_conditions()
            .iter()
            .any(|item| item.target == condition.target && item.supports(condition.operator));
        if !supported {
            return Err(DrawingError::argument(
                "condition",
                format!(
                    "{:?} on {:?} is not offered by {}",
                    condition.operator,
                    condition.target,
                    self.kind().name()
                ),
            ));
        }

        let recent = &samples[samples.len().saturating_sub(2)..];
        let projected = recent
            .iter()
            .map(|sample| project_sample(*sample, ctx))
            .collect::<DrawingResult<Vec<_>>>()?;
        let geometry = self.resolve_geometry(ctx)?;

        if condition.target == AlertTarget::Area {
            let region = geometry.region.as_ref().ok_or_else(|| {
                DrawingError::InvalidData(format!("{} has no region", self.kind().name()))
            })?;
            return evaluate_region_condition(condition.operator, &projected, |point| {
                region.contains(point)
            });
        }

        let line = geometry.line_for(condition.target).ok_or_else(|| {
            DrawingError::InvalidData(format!(
                "{:?} is not currently resolvable on {}",
                condition.target,
                self.kind().name()
            ))
        })?;
        let (min_x, max_x) = line.horizontal_extent();
        let upward = ctx.scales.price_increases_upward();
        let side = |point: PixelPoint| {
            if point.x < min_x || point.x > max_x {
                return None;
            }
            // LeftOrAbove must mean "greater than the line" for the evaluator.
            Some(match point_line_side(line.start, line.end, point) {
                LineSide::OnLine => LineSide::OnLine,
                side if upward => side,
                LineSide::LeftOrAbove => LineSide::RightOrBelow,
                LineSide::RightOrBelow => LineSide::LeftOrAbove,
            })
        };
        let is_equal = |point: PixelPoint| {
            signed_distance_to_line(line.start, line.end, point).abs() <= equal_tolerance_px.abs()
        };
        evaluate_line_condition(condition.operator, &projected, side, is_equal)
    }
}

fn project_sample(sample: AlertSample, ctx: ChartContext<'_>) -> DrawingResult<PixelPoint> {
    let x = match ctx.scales.horizontal_axis() {
        HorizontalAxis::Time => ctx.scales.time_to_x(sample.time)?,
        HorizontalAxis::BarIndex => {
            let index = ctx.bars.index_of_time(sample.time).ok_or_else(|| {
                DrawingError::InvalidData(format!("no bar matches sample time {}", sample.time))
            })?;
            ctx.scales.slot_to_x(index as f64)?
        }
    };
    Ok(PixelPoint::new(x, ctx.scales.price_to_y(sample.value)?))
}
