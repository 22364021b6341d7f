use approx::assert_abs_diff_eq;
use chart_drawing::api::{AnchorSpec, ToolRequest};
use chart_drawing::core::{
    LinearChartScales, OhlcBar, PriceScale, PriceScaleMode, TimeAxis, ToolId, Viewport,
};
use chart_drawing::interaction::{CursorStyle, DrawingState, PointerInput, PointerOutcome};
use chart_drawing::style::ToolStyle;
use chart_drawing::tools::ToolKind;
use chart_drawing::{DrawingEngine, DrawingEngineConfig};

const T0: f64 = 1_700_000_000.0;
const LAST: i64 = 99;

fn bars() -> Vec<OhlcBar> {
    (0..=LAST)
        .map(|index| {
            let close = 150.0 + (index % 7) as f64;
            OhlcBar::new(T0 + index as f64 * 60.0, close, close + 2.0, close - 2.0, close)
                .expect("valid bar")
        })
        .collect()
}

/// 1000x500 panel: slot `s` sits at x = 10 * (s - first_slot), price `p` at y = 500 - p.
fn engine_showing(first_slot: f64) -> DrawingEngine<LinearChartScales> {
    let scales = LinearChartScales::new(
        Viewport::new(1000, 500),
        (first_slot, first_slot + 100.0),
        PriceScale::new(0.0, 500.0).expect("price scale"),
    )
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
    engine_showing(0.0)
}

fn at(index: i64, price: f64) -> AnchorSpec {
    AnchorSpec::bars_ago(LAST - index, price)
}

/// Line from (200, 400) to (400, 300).
fn placed_line(engine: &mut DrawingEngine<LinearChartScales>) -> ToolId {
    engine
        .create_tool(ToolRequest::new(
            "interaction-test",
            "line",
            ToolKind::Line,
            vec![at(20, 100.0), at(40, 200.0)],
        ))
        .expect("line")
}

#[test]
fn building_places_anchors_in_order() {
    let mut engine = engine();
    let id = engine
        .begin_drawing(ToolKind::Line, ToolStyle::default())
        .expect("begin");
    assert_eq!(engine.active_tool(), Some(id));
    assert_eq!(
        engine.cursor_at(PointerInput::at(10.0, 10.0).point).expect("cursor"),
        CursorStyle::Draw
    );

    let first = engine.pointer_down(PointerInput::at(200.0, 250.0)).expect("down");
    assert_eq!(first.tool, Some(id));
    assert_eq!(first.outcome, PointerOutcome::AnchorPlaced(0));

    assert!(engine.pointer_move(PointerInput::at(400.0, 150.0)).expect("move"));
    let tool = engine.tool(id).expect("tool");
    assert_eq!(tool.state(), DrawingState::Building);
    assert_abs_diff_eq!(tool.anchors()[1].slot_index, 40.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tool.anchors()[1].price, 350.0, epsilon = 1e-9);
    assert!(tool.anchors()[1].is_editing);

    let done = engine.pointer_down(PointerInput::at(400.0, 150.0)).expect("down");
    assert_eq!(done.outcome, PointerOutcome::BuildCompleted);
    let tool = engine.tool(id).expect("tool");
    assert_eq!(tool.state(), DrawingState::Normal);
    assert!(tool.selected);
    assert!(tool.anchors().iter().all(|anchor| !anchor.is_editing));
    assert_abs_diff_eq!(tool.anchors()[0].slot_index, 20.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tool.anchors()[0].price, 250.0, epsilon = 1e-9);
    assert_eq!(engine.active_tool(), None);
}

#[test]
fn scripted_tag_matching_a_drawn_tool_leaves_it_alone() {
    let mut engine = engine();
    let drawn = engine
        .begin_drawing(ToolKind::Line, ToolStyle::default())
        .expect("begin");
    engine.pointer_down(PointerInput::at(200.0, 250.0)).expect("down");
    engine.pointer_down(PointerInput::at(400.0, 150.0)).expect("down");
    let drawn_tag = engine.tool(drawn).expect("drawn").tag().to_owned();
    assert_eq!(drawn_tag, drawn.to_string());

    let scripted = engine
        .create_tool(ToolRequest::new(
            "interaction-test",
            drawn_tag.as_str(),
            ToolKind::Line,
            vec![at(50, 100.0), at(60, 120.0)],
        ))
        .expect("scripted");
    assert_eq!(engine.tool_count(), 2);
    assert_eq!(engine.tool(drawn).expect("drawn kept").owner(), None);

    // A second request with the same tag still replaces the scripted tool only.
    let again = engine
        .create_tool(ToolRequest::new(
            "interaction-test",
            drawn_tag.as_str(),
            ToolKind::Line,
            vec![at(50, 110.0), at(60, 130.0)],
        ))
        .expect("again");
    assert!(engine.tool(scripted).is_none());
    assert!(engine.tool(again).is_some());
    assert!(engine.tool(drawn).is_some());
    assert_eq!(engine.tool_count(), 2);
}

#[test]
fn placement_before_the_first_bar_is_rejected() {
    let mut engine = engine_showing(-50.0);
    let id = engine
        .begin_drawing(ToolKind::HorizontalLine, ToolStyle::default())
        .expect("begin");

    let rejected = engine.pointer_down(PointerInput::at(100.0, 250.0)).expect("down");
    assert_eq!(rejected.outcome, PointerOutcome::Rejected);
    let tool = engine.tool(id).expect("tool");
    assert_eq!(tool.state(), DrawingState::Building);
    assert!(tool.anchors()[0].is_editing);

    let accepted = engine.pointer_down(PointerInput::at(700.0, 250.0)).expect("down");
    assert_eq!(accepted.outcome, PointerOutcome::BuildCompleted);
}

#[test]
fn nothing_is_placeable_without_bars() {
    let mut engine = engine();
    engine.set_bars(Vec::new()).expect("clear bars");
    engine
        .begin_drawing(ToolKind::VerticalLine, ToolStyle::default())
        .expect("begin");
    let outcome = engine.pointer_down(PointerInput::at(300.0, 250.0)).expect("down");
    assert_eq!(outcome.outcome, PointerOutcome::Rejected);
}

#[test]
fn editing_moves_only_the_grabbed_anchor() {
    let mut engine = engine();
    let id = placed_line(&mut engine);

    let down = engine.pointer_down(PointerInput::at(201.0, 401.0)).expect("down");
    assert_eq!(down.outcome, PointerOutcome::EditStarted(0));
    assert_eq!(engine.tool(id).expect("tool").state(), DrawingState::Editing);

    assert!(engine.pointer_move(PointerInput::at(250.0, 350.0)).expect("move"));
    let tool = engine.tool(id).expect("tool");
    assert_abs_diff_eq!(tool.anchors()[0].slot_index, 25.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tool.anchors()[0].price, 150.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tool.anchors()[1].slot_index, 40.0, epsilon = 1e-9);

    let up = engine.pointer_up();
    assert_eq!(up.outcome, PointerOutcome::EditFinished);
    let tool = engine.tool(id).expect("tool");
    assert_eq!(tool.state(), DrawingState::Normal);
    assert!(!tool.anchors()[0].is_editing);
    assert_eq!(engine.active_tool(), None);
}

#[test]
fn moving_translates_every_anchor() {
    let mut engine = engine();
    let id = placed_line(&mut engine);

    let down = engine.pointer_down(PointerInput::at(300.0, 350.0)).expect("down");
    assert_eq!(down.outcome, PointerOutcome::MoveStarted);
    assert_eq!(
        engine.cursor_at(PointerInput::at(300.0, 350.0).point).expect("cursor"),
        CursorStyle::Move
    );

    assert!(engine.pointer_move(PointerInput::at(350.0, 340.0)).expect("move"));
    let tool = engine.tool(id).expect("tool");
    assert_abs_diff_eq!(tool.anchors()[0].slot_index, 25.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tool.anchors()[1].slot_index, 45.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tool.anchors()[0].price, 110.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tool.anchors()[1].price, 210.0, epsilon = 1e-9);

    assert_eq!(engine.pointer_up().outcome, PointerOutcome::MoveFinished);
}

#[test]
fn move_before_the_first_bar_is_rejected_atomically() {
    let mut engine = engine();
    let id = placed_line(&mut engine);
    let before = engine.tool(id).expect("tool").anchors().to_vec();

    engine.pointer_down(PointerInput::at(300.0, 350.0)).expect("down");
    // Start anchor would land on slot -10.
    assert!(!engine.pointer_move(PointerInput::at(0.0, 350.0)).expect("move"));
    assert_eq!(engine.tool(id).expect("tool").anchors(), before.as_slice());

    engine.pointer_up();
    assert_eq!(engine.tool(id).expect("tool").state(), DrawingState::Normal);
}

#[test]
fn shift_snaps_relative_to_the_opposite_anchor() {
    let mut engine = engine();
    let id = engine
        .begin_drawing(ToolKind::Line, ToolStyle::default())
        .expect("begin");
    engine.pointer_down(PointerInput::at(200.0, 250.0)).expect("down");
    assert!(
        engine
            .pointer_move(PointerInput::at(400.0, 260.0).with_shift(true))
            .expect("move")
    );
    let tool = engine.tool(id).expect("tool");
    assert_abs_diff_eq!(tool.anchors()[1].price, 250.0, epsilon = 1e-9);
    assert!(tool.anchors()[1].slot_index > 40.0);
}

#[test]
fn locked_tools_select_but_never_edit() {
    let mut engine = engine();
    let id = placed_line(&mut engine);
    engine.tool_mut(id).expect("tool").locked = true;

    let down = engine.pointer_down(PointerInput::at(200.0, 400.0)).expect("down");
    assert_eq!(down.outcome, PointerOutcome::Selected);
    let tool = engine.tool(id).expect("tool");
    assert!(tool.selected);
    assert_eq!(tool.state(), DrawingState::Normal);
    assert_eq!(engine.active_tool(), None);
    assert_eq!(
        engine.cursor_at(PointerInput::at(200.0, 400.0).point).expect("cursor"),
        CursorStyle::Forbidden
    );
}

#[test]
fn clicking_empty_space_deselects() {
    let mut engine = engine();
    let id = placed_line(&mut engine);
    engine.tool_mut(id).expect("tool").selected = true;

    let down = engine.pointer_down(PointerInput::at(900.0, 50.0)).expect("down");
    assert_eq!(down.tool, None);
    assert_eq!(down.outcome, PointerOutcome::Deselected);
    assert!(!engine.tool(id).expect("tool").selected);
    assert_eq!(engine.pointer_up().outcome, PointerOutcome::Ignored);
}

#[test]
fn topmost_tool_wins_the_hit() {
    let mut engine = engine();
    let bottom = placed_line(&mut engine);
    let top = engine
        .create_tool(ToolRequest::new(
            "interaction-test",
            "overlap",
            ToolKind::Line,
            vec![at(20, 100.0), at(40, 200.0)],
        ))
        .expect("second line");

    let down = engine.pointer_down(PointerInput::at(300.0, 350.0)).expect("down");
    assert_eq!(down.tool, Some(top));
    assert!(!engine.tool(bottom).expect("tool").selected);
}

#[test]
fn cursors_follow_the_hit_target() {
    let mut engine = engine();
    placed_line(&mut engine);
    engine
        .create_tool(ToolRequest::new(
            "interaction-test",
            "level",
            ToolKind::HorizontalLine,
            vec![at(70, 50.0)],
        ))
        .expect("horizontal line");

    let cursor = |engine: &DrawingEngine<LinearChartScales>, x, y| {
        engine.cursor_at(PointerInput::at(x, y).point).expect("cursor")
    };
    assert_eq!(cursor(&engine, 200.0, 400.0), CursorStyle::ResizeNesw);
    assert_eq!(cursor(&engine, 300.0, 350.0), CursorStyle::Move);
    assert_eq!(cursor(&engine, 700.0, 450.0), CursorStyle::ResizeVertical);
    assert_eq!(cursor(&engine, 900.0, 50.0), CursorStyle::None);
}

#[test]
fn parallel_channel_keeps_its_offset_until_edited_directly() {
    let mut engine = engine();
    let id = engine
        .create_tool(ToolRequest::new(
            "interaction-test",
            "channel",
            ToolKind::ParallelChannel,
            vec![at(20, 100.0), at(40, 200.0), at(35, 250.0)],
        ))
        .expect("channel");
    let derived = &engine.tool(id).expect("tool").anchors()[2];
    assert_abs_diff_eq!(derived.slot_index, 30.0, epsilon = 1e-9);
    assert_abs_diff_eq!(derived.price, 250.0, epsilon = 1e-9);

    // Grab the start anchor and raise it by 100.
    assert_eq!(
        engine.pointer_down(PointerInput::at(200.0, 400.0)).expect("down").outcome,
        PointerOutcome::EditStarted(0)
    );
    assert!(engine.pointer_move(PointerInput::at(200.0, 300.0)).expect("move"));
    engine.pointer_up();
    let derived = &engine.tool(id).expect("tool").anchors()[2];
    assert_abs_diff_eq!(derived.price, 300.0, epsilon = 1e-9);
    assert_abs_diff_eq!(derived.slot_index, 30.0, epsilon = 1e-9);

    // Now drag the derived anchor itself; its slot stays pinned to the midpoint.
    assert_eq!(
        engine.pointer_down(PointerInput::at(300.0, 200.0)).expect("down").outcome,
        PointerOutcome::EditStarted(2)
    );
    assert!(engine.pointer_move(PointerInput::at(320.0, 150.0)).expect("move"));
    engine.pointer_up();
    let tool = engine.tool(id).expect("tool");
    assert_abs_diff_eq!(tool.anchors()[2].slot_index, 30.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tool.anchors()[2].price, 350.0, epsilon = 1e-9);
}

#[test]
fn moving_a_channel_on_a_log_scale_keeps_its_shape() {
    let price_scale = PriceScale::new_with_mode(10.0, 1000.0, PriceScaleMode::Log).expect("log scale");
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
    let id = engine
        .create_tool(ToolRequest::new(
            "interaction-test",
            "channel",
            ToolKind::ParallelChannel,
            vec![at(20, 100.0), at(40, 120.0), at(35, 300.0)],
        ))
        .expect("channel");

    let pixels = |engine: &DrawingEngine<LinearChartScales>| {
        engine
            .tool(id)
            .expect("tool")
            .anchors()
            .iter()
            .map(|anchor| anchor.project(engine.scales()).expect("project"))
            .collect::<Vec<_>>()
    };
    let before = pixels(&engine);

    // Base line midpoint, well away from every handle.
    let grab = PointerInput::at(300.0, (before[0].y + before[1].y) / 2.0);
    assert_eq!(engine.pointer_down(grab).expect("down").outcome, PointerOutcome::MoveStarted);
    assert!(engine.pointer_move(PointerInput::at(grab.point.x, grab.point.y - 100.0)).expect("move"));
    engine.pointer_up();

    let after = pixels(&engine);
    for (moved, start) in after.iter().zip(&before) {
        assert_abs_diff_eq!(moved.x, start.x, epsilon = 1e-6);
        assert_abs_diff_eq!(moved.y - start.y, -100.0, epsilon = 1e-6);
    }

    // The offset line stays parallel to the base line on screen.
    let frame = engine.build_frame().expect("frame");
    let (base, parallel) = (&frame.lines[0], &frame.lines[1]);
    assert_abs_diff_eq!(parallel.y1 - base.y1, parallel.y2 - base.y2, epsilon = 1e-6);
    assert_abs_diff_eq!(parallel.y1 - base.y1, after[2].y - (after[0].y + after[1].y) / 2.0, epsilon = 1e-6);
}

#[test]
fn cancel_discards_the_tool_being_built() {
    let mut engine = engine();
    let id = engine
        .begin_drawing(ToolKind::Triangle, ToolStyle::default())
        .expect("begin");
    engine.pointer_down(PointerInput::at(200.0, 250.0)).expect("down");
    let discarded = engine.cancel_drawing().expect("building tool");
    assert_eq!(discarded.id(), id);
    assert_eq!(engine.tool_count(), 0);
    assert_eq!(engine.active_tool(), None);
}
