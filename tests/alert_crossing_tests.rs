use chart_drawing::alerts::{
    AlertCondition, AlertSample, AlertTarget, ConditionOperator, CrossingTracker,
    did_predicate_cross,
};
use chart_drawing::api::{AnchorSpec, ToolRequest};
use chart_drawing::core::{
    LinearChartScales, OhlcBar, PriceScale, TimeAxis, ToolId, Viewport,
};
use chart_drawing::style::{AreaFill, Color, Stroke, ToolStyle};
use chart_drawing::tools::{FibonacciParams, RegressionParams, ToolKind};
use chart_drawing::{DrawingEngine, DrawingEngineConfig, DrawingError};

const T0: f64 = 1_700_000_000.0;
const LAST: i64 = 99;

fn time_of(index: usize) -> f64 {
    T0 + index as f64 * 60.0
}

fn bars() -> Vec<OhlcBar> {
    (0..=LAST as usize)
        .map(|index| {
            let close = 100.0 + (index % 5) as f64;
            OhlcBar::new(time_of(index), close, close + 1.0, close - 1.0, close).expect("valid bar")
        })
        .collect()
}

fn engine_with(price_scale: PriceScale) -> DrawingEngine<LinearChartScales> {
    let scales = LinearChartScales::new(Viewport::new(1000, 500), (0.0, 100.0), price_scale)
        .expect("scales")
        .with_time_axis(TimeAxis::Regular {
            origin_time: T0,
            bar_interval: 60.0,
        })
        .expect("time axis");
    let mut engine = DrawingEngine::new(DrawingEngineConfig::new(Viewport::new(1000, 500)), scales)
        .expect("engine init");
    engine.set_bars(bars()).expect("bars");
    engine
}

fn engine() -> DrawingEngine<LinearChartScales> {
    engine_with(PriceScale::new(0.0, 500.0).expect("price scale"))
}

fn at(index: i64, price: f64) -> AnchorSpec {
    AnchorSpec::bars_ago(LAST - index, price)
}

fn create(engine: &mut DrawingEngine<LinearChartScales>, tag: &str, kind: ToolKind, anchors: Vec<AnchorSpec>) -> ToolId {
    engine
        .create_tool(ToolRequest::new("alerts-test", tag, kind, anchors))
        .expect("tool created")
}

fn samples(index: usize, values: &[f64]) -> Vec<AlertSample> {
    values
        .iter()
        .enumerate()
        .map(|(offset, value)| AlertSample::new(time_of(index + offset), *value))
        .collect()
}

fn line(operator: ConditionOperator) -> AlertCondition {
    AlertCondition::new(AlertTarget::Line, operator)
}

#[test]
fn crossing_needs_a_change_between_the_last_two_samples() {
    assert!(did_predicate_cross(&[99.0, 99.0, 101.0], |v: &f64| *v > 100.0));
    assert!(!did_predicate_cross(&[99.0, 101.0, 102.0], |v: &f64| *v > 100.0));
    assert!(!did_predicate_cross(&[101.0], |v: &f64| *v > 100.0));
    assert!(!did_predicate_cross(&[] as &[f64], |v: &f64| *v > 100.0));
}

#[test]
fn tracker_fires_once_per_transition() {
    let mut tracker = CrossingTracker::new();
    let fired: Vec<bool> = [99.0, 99.0, 101.0, 102.0, 98.0]
        .into_iter()
        .map(|value| tracker.observe(value > 100.0))
        .collect();
    assert_eq!(fired, vec![false, false, true, false, true]);
    tracker.reset();
    assert_eq!(tracker.last(), None);
}

#[test]
fn horizontal_line_cross_above_and_levels() {
    let mut engine = engine();
    let id = create(&mut engine, "h", ToolKind::HorizontalLine, vec![at(89, 100.0)]);

    let rising = samples(50, &[99.0, 101.0]);
    assert!(engine.evaluate_alert(id, line(ConditionOperator::CrossAbove), &rising).expect("eval"));
    assert!(!engine.evaluate_alert(id, line(ConditionOperator::CrossBelow), &rising).expect("eval"));
    assert!(engine.evaluate_alert(id, line(ConditionOperator::Greater), &rising).expect("eval"));
    assert!(!engine.evaluate_alert(id, line(ConditionOperator::Less), &rising).expect("eval"));

    let steady = samples(50, &[101.0, 102.0]);
    assert!(!engine.evaluate_alert(id, line(ConditionOperator::CrossAbove), &steady).expect("eval"));

    let falling = samples(50, &[101.0, 99.0]);
    assert!(engine.evaluate_alert(id, line(ConditionOperator::CrossBelow), &falling).expect("eval"));
    assert!(engine.evaluate_alert(id, line(ConditionOperator::LessEqual), &falling).expect("eval"));
}

#[test]
fn equal_uses_the_pixel_tolerance() {
    let mut engine = engine();
    let id = create(&mut engine, "h", ToolKind::HorizontalLine, vec![at(89, 100.0)]);

    let touching = samples(50, &[90.0, 100.2]);
    assert!(engine.evaluate_alert(id, line(ConditionOperator::Equal), &touching).expect("eval"));
    assert!(engine.evaluate_alert(id, line(ConditionOperator::GreaterEqual), &touching).expect("eval"));
    assert!(!engine.evaluate_alert(id, line(ConditionOperator::Greater), &touching).expect("eval"));
    assert!(!engine.evaluate_alert(id, line(ConditionOperator::NotEqual), &touching).expect("eval"));

    let away = samples(50, &[90.0, 103.0]);
    assert!(!engine.evaluate_alert(id, line(ConditionOperator::Equal), &away).expect("eval"));
}

#[test]
fn segment_alerts_only_inside_horizontal_extent() {
    let mut engine = engine();
    let segment = create(&mut engine, "segment", ToolKind::Line, vec![at(40, 100.0), at(60, 100.0)]);
    let ray = create(&mut engine, "ray", ToolKind::Ray, vec![at(40, 100.0), at(60, 100.0)]);

    let inside = samples(50, &[101.0]);
    assert!(engine.evaluate_alert(segment, line(ConditionOperator::Greater), &inside).expect("eval"));

    let beyond = samples(80, &[101.0]);
    assert!(!engine.evaluate_alert(segment, line(ConditionOperator::Greater), &beyond).expect("eval"));
    assert!(!engine.evaluate_alert(segment, line(ConditionOperator::Less), &beyond).expect("eval"));
    assert!(engine.evaluate_alert(ray, line(ConditionOperator::Greater), &beyond).expect("eval"));
}

#[test]
fn inverted_price_axis_keeps_greater_meaning_higher_price() {
    let mut engine = engine_with(
        PriceScale::new(0.0, 500.0)
            .expect("price scale")
            .with_inverted(true),
    );
    let id = create(&mut engine, "h", ToolKind::HorizontalLine, vec![at(89, 100.0)]);
    let rising = samples(50, &[99.0, 101.0]);
    assert!(engine.evaluate_alert(id, line(ConditionOperator::Greater), &rising).expect("eval"));
    assert!(engine.evaluate_alert(id, line(ConditionOperator::CrossAbove), &rising).expect("eval"));
}

#[test]
fn region_alerts_on_rectangles() {
    let mut engine = engine();
    let style = ToolStyle::new(Stroke::default()).with_area(AreaFill::new(Color::rgb(0.2, 0.4, 0.8), 30));
    let id = engine
        .create_tool(
            ToolRequest::new("alerts-test", "box", ToolKind::Rectangle, vec![at(40, 90.0), at(60, 110.0)])
                .with_style(style),
        )
        .expect("rectangle");

    let entering = samples(50, &[120.0, 100.0]);
    let area = |operator| AlertCondition::new(AlertTarget::Area, operator);
    assert!(engine.evaluate_alert(id, area(ConditionOperator::CrossInside), &entering).expect("eval"));
    assert!(engine.evaluate_alert(id, area(ConditionOperator::Inside), &entering).expect("eval"));
    assert!(!engine.evaluate_alert(id, area(ConditionOperator::Outside), &entering).expect("eval"));
    assert!(!engine.evaluate_alert(id, area(ConditionOperator::CrossOutside), &entering).expect("eval"));

    let err = engine
        .evaluate_alert(id, area(ConditionOperator::Greater), &entering)
        .expect_err("line operator on a region");
    assert!(matches!(err, DrawingError::InvalidArgument { field: "condition", .. }));
}

#[test]
fn vertical_lines_and_text_offer_no_alerts() {
    let mut engine = engine();
    let vertical = create(&mut engine, "v", ToolKind::VerticalLine, vec![at(50, 100.0)]);
    assert!(engine.alert_conditions(vertical).expect("conditions").is_empty());
    assert!(
        engine
            .evaluate_alert(vertical, line(ConditionOperator::Greater), &samples(50, &[101.0]))
            .is_err()
    );
}

#[test]
fn fibonacci_levels_are_individual_targets() {
    let mut engine = engine();
    let kind = ToolKind::FibonacciRetracement(FibonacciParams::retracement(Stroke::default()));
    let id = create(&mut engine, "fib", kind, vec![at(40, 100.0), at(60, 200.0)]);
    assert_eq!(engine.alert_conditions(id).expect("conditions").len(), 7);

    // Level 3 is 50%, at 150.
    let half = AlertCondition::new(AlertTarget::Level(3), ConditionOperator::CrossAbove);
    assert!(engine.evaluate_alert(id, half, &samples(50, &[149.0, 151.0])).expect("eval"));

    engine
        .tool_mut(id)
        .expect("tool")
        .modify_kind(|kind| {
            if let ToolKind::FibonacciRetracement(params) = kind {
                params.levels[3].is_visible = false;
            }
        })
        .expect("levels edited");
    let items = engine.alert_conditions(id).expect("conditions");
    assert_eq!(items.len(), 6);
    assert!(items.iter().all(|item| item.target != AlertTarget::Level(3)));
}

#[test]
fn channel_and_regression_targets() {
    let mut engine = engine();
    let channel = create(
        &mut engine,
        "channel",
        ToolKind::ParallelChannel,
        vec![at(40, 100.0), at(60, 100.0), at(50, 150.0)],
    );
    let above_both = samples(50, &[151.0]);
    let upper = AlertCondition::new(AlertTarget::ChannelUpper, ConditionOperator::Greater);
    let lower = AlertCondition::new(AlertTarget::ChannelLower, ConditionOperator::Greater);
    assert!(engine.evaluate_alert(channel, upper, &above_both).expect("eval"));
    assert!(engine.evaluate_alert(channel, lower, &above_both).expect("eval"));
    let between = samples(50, &[120.0]);
    assert!(!engine.evaluate_alert(channel, upper, &between).expect("eval"));
    assert!(engine.evaluate_alert(channel, lower, &between).expect("eval"));

    let regression = create(
        &mut engine,
        "regression",
        ToolKind::RegressionChannel(RegressionParams::default()),
        vec![at(10, 0.0), at(90, 0.0)],
    );
    let targets: Vec<AlertTarget> = engine
        .alert_conditions(regression)
        .expect("conditions")
        .into_iter()
        .map(|item| item.target)
        .collect();
    assert_eq!(
        targets,
        vec![
            AlertTarget::RegressionUpper,
            AlertTarget::RegressionMiddle,
            AlertTarget::RegressionLower
        ]
    );
    let middle = AlertCondition::new(AlertTarget::RegressionMiddle, ConditionOperator::Greater);
    assert!(engine.evaluate_alert(regression, middle, &samples(50, &[150.0])).expect("eval"));
    assert!(!engine.evaluate_alert(regression, middle, &samples(50, &[50.0])).expect("eval"));
}

#[test]
fn unknown_tool_is_reported() {
    let engine = engine();
    let err = engine
        .evaluate_alert(ToolId(42), line(ConditionOperator::Greater), &samples(0, &[1.0]))
        .expect_err("no such tool");
    assert!(matches!(err, DrawingError::UnknownTool(ToolId(42))));
}
