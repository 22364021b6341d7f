use chart_drawing::api::{AnchorSpec, ToolRequest};
use chart_drawing::core::{
    LinearChartScales, OhlcBar, PixelPoint, PixelRect, PriceScale, PriceSelector, TimeAxis,
    Viewport,
};
use chart_drawing::geometry::{extended_point, is_point_inside_polygon, point_line_side};
use chart_drawing::regression::{ChannelMode, compute_regression_channel};
use chart_drawing::style::Stroke;
use chart_drawing::tools::{FibonacciParams, RegressionParams, ToolKind};
use chart_drawing::{DrawingEngine, DrawingEngineConfig};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const T0: f64 = 1_700_000_000.0;

fn generated_bars(count: usize) -> Vec<OhlcBar> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let base = 100.0 + t * 0.05;
            let open = base;
            let close = if i % 2 == 0 { base + 1.0 } else { base - 1.0 };
            let low = open.min(close) - 0.75;
            let high = open.max(close) + 0.75;
            OhlcBar::new(T0 + t * 60.0, open, high, low, close).expect("valid generated bar")
        })
        .collect()
}

fn bench_geometry_kernel(c: &mut Criterion) {
    let bounds = PixelRect::new(0.0, 0.0, 1920.0, 1080.0);
    let start = PixelPoint::new(120.0, 900.0);
    let through = PixelPoint::new(480.0, 610.0);
    let polygon: Vec<PixelPoint> = (0..32)
        .map(|i| {
            let angle = f64::from(i) * std::f64::consts::TAU / 32.0;
            let radius = if i % 2 == 0 { 300.0 } else { 150.0 };
            PixelPoint::new(960.0 + radius * angle.cos(), 540.0 + radius * angle.sin())
        })
        .collect();

    c.bench_function("extended_point", |b| {
        b.iter(|| extended_point(black_box(start), black_box(through), black_box(bounds)))
    });
    c.bench_function("point_line_side", |b| {
        b.iter(|| point_line_side(black_box(start), black_box(through), black_box(PixelPoint::new(700.0, 200.0))))
    });
    c.bench_function("point_inside_star_polygon", |b| {
        b.iter(|| is_point_inside_polygon(black_box(PixelPoint::new(1010.0, 560.0)), black_box(&polygon)))
    });
}

fn bench_regression_channel_10k(c: &mut Criterion) {
    let bars = generated_bars(10_000);

    c.bench_function("regression_channel_10k", |b| {
        b.iter(|| {
            compute_regression_channel(
                black_box(&bars),
                black_box(0),
                black_box(9_999),
                PriceSelector::Close,
                ChannelMode::default(),
            )
            .expect("regression should succeed")
        })
    });
}

fn bench_engine_frame_and_hit_test(c: &mut Criterion) {
    let scales = LinearChartScales::new(
        Viewport::new(1600, 900),
        (0.0, 2_000.0),
        PriceScale::new(0.0, 300.0).expect("valid price scale"),
    )
    .expect("valid scales")
    .with_time_axis(TimeAxis::Regular {
        origin_time: T0,
        bar_interval: 60.0,
    })
    .expect("valid time axis");
    let config = DrawingEngineConfig::new(Viewport::new(1600, 900));
    let mut engine = DrawingEngine::new(config, scales).expect("engine init");
    engine.set_bars(generated_bars(2_000)).expect("bars");

    for i in 0..200_i64 {
        let ago = 1_900 - i * 9;
        let kind = match i % 4 {
            0 => ToolKind::Line,
            1 => ToolKind::Rectangle,
            2 => ToolKind::FibonacciRetracement(FibonacciParams::retracement(Stroke::default())),
            _ => ToolKind::RegressionChannel(RegressionParams::default()),
        };
        let anchors = vec![
            AnchorSpec::bars_ago(ago, 120.0 + (i % 7) as f64),
            AnchorSpec::bars_ago(ago - 60, 160.0 - (i % 5) as f64),
        ];
        engine
            .create_tool(ToolRequest::new("bench", format!("tool-{i}"), kind, anchors))
            .expect("tool created");
    }

    c.bench_function("engine_build_frame_200_tools", |b| {
        b.iter(|| engine.build_frame().expect("frame should build"))
    });
    c.bench_function("engine_cursor_at_200_tools", |b| {
        b.iter(|| {
            engine
                .cursor_at(black_box(PixelPoint::new(800.0, 450.0)))
                .expect("cursor lookup")
        })
    });
}

criterion_group!(
    benches,
    bench_geometry_kernel,
    bench_regression_channel_10k,
    bench_engine_frame_and_hit_test
);
criterion_main!(benches);
