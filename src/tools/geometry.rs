//! Pixel-space geometry of a tool, resolved once per query from anchors,
//! levels and cached derived values.

use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::alerts::AlertTarget;
use crate::core::{ChartContext, PixelPoint, PixelRect};
use crate::error::{DrawingError, DrawingResult};
use crate::geometry::{
    distance_to_segment, extended_point, is_point_along_vector, is_point_inside_ellipse,
    is_point_inside_polygon,
};
use crate::render::TextHAlign;
use crate::regression::PricePair;
use crate::style::{Color, DashStyle, Stroke};

use super::{DrawingTool, FibonacciParams, MarkerShape, ToolKind};

const LABEL_FONT_SIZE_PX: f64 = 11.0;
const LABEL_PADDING_PX: f64 = 4.0;

/// A straight element of a tool, optionally extended to the panel edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLine {
    /// Alert target this line stands for, if any.
    pub target: Option<AlertTarget>,
    pub start: PixelPoint,
    pub end: PixelPoint,
    /// Extend past `start` (away from `end`) to the panel edge.
    pub extend_start: bool,
    /// Extend past `end` (away from `start`) to the panel edge.
    pub extend_end: bool,
    /// Hidden lines only feed alerts.
    pub drawn: bool,
    pub stroke: Stroke,
    /// Snap axis-aligned strokes to pixel centers when rendered.
    pub crisp: bool,
}

impl ResolvedLine {
    fn new(start: PixelPoint, end: PixelPoint, stroke: Stroke) -> Self {
        Self {
            target: None,
            start,
            end,
            extend_start: false,
            extend_end: false,
            drawn: true,
            stroke,
            crisp: false,
        }
    }

    fn target(mut self, target: AlertTarget) -> Self {
        self.target = Some(target);
        self
    }

    fn extended(mut self, extend_start: bool, extend_end: bool) -> Self {
        self.extend_start = extend_start;
        self.extend_end = extend_end;
        self
    }

    fn hidden(mut self) -> Self {
        self.drawn = false;
        self
    }

    fn crisp(mut self) -> Self {
        self.crisp = true;
        self
    }

    /// Endpoints after extension to `bounds`.
    #[must_use]
    pub fn visible_endpoints(&self, bounds: PixelRect) -> (PixelPoint, PixelPoint) {
        let start = if self.extend_start {
            extended_point(self.end, self.start, bounds)
        } else {
            self.start
        };
        let end = if self.extend_end {
            extended_point(self.start, self.end, bounds)
        } else {
            self.end
        };
        (start, end)
    }

    /// Horizontal extent in pixels, unbounded on extended sides.
    #[must_use]
    pub fn horizontal_extent(&self) -> (f64, f64) {
        let (left, right, left_extended, right_extended) = if self.start.x <= self.end.x {
            (self.start.x, self.end.x, self.extend_start, self.extend_end)
        } else {
            (self.end.x, self.start.x, self.extend_end, self.extend_start)
        };
        (
            if left_extended { f64::NEG_INFINITY } else { left },
            if right_extended { f64::INFINITY } else { right },
        )
    }

    #[must_use]
    pub fn is_near(&self, point: PixelPoint, bounds: PixelRect, tolerance: f64) -> bool {
        let (start, end) = self.visible_endpoints(bounds);
        let vector = PixelPoint::new(end.x - start.x, end.y - start.y);
        is_point_along_vector(point, start, vector, tolerance)
    }
}

/// Enclosed area of a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedRegion {
    Polygon(Vec<PixelPoint>),
    Ellipse {
        center: PixelPoint,
        radius_x: f64,
        radius_y: f64,
    },
    Rect(PixelRect),
}

impl ResolvedRegion {
    #[must_use]
    pub fn contains(&self, point: PixelPoint) -> bool {
        match self {
            Self::Polygon(points) => is_point_inside_polygon(point, points),
            Self::Ellipse {
                center,
                radius_x,
                radius_y,
            } => is_point_inside_ellipse(*center, point, *radius_x, *radius_y),
            Self::Rect(rect) => rect.contains(point),
        }
    }

    /// `true` when `point` lies within `tolerance` of the outline.
    #[must_use]
    pub fn is_near_outline(&self, point: PixelPoint, tolerance: f64) -> bool {
        match self {
            Self::Polygon(points) => {
                let count = points.len();
                (0..count).any(|i| {
                    distance_to_segment(point, points[i], points[(i + 1) % count]) <= tolerance
                })
            }
            Self::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                let outer = is_point_inside_ellipse(
                    *center,
                    point,
                    radius_x + tolerance,
                    radius_y + tolerance,
                );
                let inner = *radius_x > tolerance
                    && *radius_y > tolerance
                    && is_point_inside_ellipse(
                        *center,
                        point,
                        radius_x - tolerance,
                        radius_y - tolerance,
                    );
                outer && !inner
            }
            Self::Rect(rect) => {
                rect.inflate(tolerance).contains(point)
                    && !(rect.width() > 2.0 * tolerance
                        && rect.height() > 2.0 * tolerance
                        && rect.inflate(-tolerance).contains(point))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLabel {
    pub text: String,
    pub position: PixelPoint,
    pub h_align: TextHAlign,
    pub font_size_px: f64,
    pub color: Color,
}

/// Everything a tool looks like in pixel space for one chart state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolGeometry {
    pub anchors: SmallVec<[PixelPoint; 3]>,
    pub lines: Vec<ResolvedLine>,
    pub region: Option<ResolvedRegion>,
    /// Region hit testing also counts the interior, not just the outline.
    pub solid_region: bool,
    pub labels: Vec<ResolvedLabel>,
}

impl ToolGeometry {
    #[must_use]
    pub fn line_for(&self, target: AlertTarget) -> Option<&ResolvedLine> {
        self.lines.iter().find(|line| line.target == Some(target))
    }
}

/// Part of a tool under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Anchor(usize),
    Body,
}

impl DrawingTool {
    /// Resolves the tool to pixel space. Read-only: only transient caches
    /// may be refreshed.
    pub fn resolve_geometry(&self, ctx: ChartContext<'_>) -> DrawingResult<ToolGeometry> {
        let scales = ctx.scales;
        let bounds = scales.bounds();
        let points: SmallVec<[PixelPoint; 3]> = self
            .anchors
            .iter()
            .map(|anchor| anchor.project(scales))
            .collect::<DrawingResult<_>>()?;
        let stroke = self.style.stroke;
        let mut geometry = ToolGeometry {
            anchors: points.clone(),
            solid_region: self.style.has_visible_area(),
            ..ToolGeometry::default()
        };

        match self.kind() {
            ToolKind::HorizontalLine => {
                let y = points[0].y;
                geometry.lines.push(
                    ResolvedLine::new(
                        PixelPoint::new(bounds.left, y),
                        PixelPoint::new(bounds.right, y),
                        stroke,
                    )
                    .target(AlertTarget::Line)
                    .extended(true, true)
                    .crisp(),
                );
            }
            ToolKind::VerticalLine => {
                let x = points[0].x;
                geometry.lines.push(
                    ResolvedLine::new(
                        PixelPoint::new(x, bounds.top),
                        PixelPoint::new(x, bounds.bottom),
                        stroke,
                    )
                    .crisp(),
                );
            }
            ToolKind::Line | ToolKind::ArrowLine => {
                geometry.lines.push(
                    ResolvedLine::new(points[0], points[1], stroke).target(AlertTarget::Line),
                );
            }
            ToolKind::Ray => {
                geometry.lines.push(
                    ResolvedLine::new(points[0], points[1], stroke)
                        .target(AlertTarget::Line)
                        .extended(false, true),
                );
            }
            ToolKind::ExtendedLine => {
                geometry.lines.push(
                    ResolvedLine::new(points[0], points[1], stroke)
                        .target(AlertTarget::Line)
                        .extended(true, true),
                );
            }
            ToolKind::Rectangle => {
                let rect = PixelRect::from_corners(points[0], points[1]);
                push_outline(&mut geometry.lines, &rect.corners(), stroke);
                geometry.region = Some(ResolvedRegion::Rect(rect));
            }
            ToolKind::Ellipse => {
                let rect = PixelRect::from_corners(points[0], points[1]);
                geometry.region = Some(ResolvedRegion::Ellipse {
                    center: rect.center(),
                    radius_x: rect.width() / 2.0,
                    radius_y: rect.height() / 2.0,
                });
            }
            ToolKind::Triangle => {
                push_outline(&mut geometry.lines, &points, stroke);
                geometry.region = Some(ResolvedRegion::Polygon(points.to_vec()));
            }
            ToolKind::ParallelChannel => {
                self.resolve_parallel_channel(&points, &mut geometry);
            }
            ToolKind::FibonacciRetracement(params) => {
                self.resolve_retracement(ctx, params, &points, &mut geometry)?;
            }
            ToolKind::FibonacciExtension(params) => {
                self.resolve_extension(ctx, params, &points, &mut geometry)?;
            }
            ToolKind::RegressionChannel(params) => {
                if let Some(channel) = self.regression_channel(ctx)? {
                    let start_x = scales.slot_to_x(channel.start_index as f64)?;
                    let end_x = scales.slot_to_x(channel.end_index as f64)?;
                    // Extension flags follow screen direction, pairs follow anchor order.
                    let (extend_start, extend_end) = if start_x <= end_x {
                        (params.extend_left, params.extend_right)
                    } else {
                        (params.extend_right, params.extend_left)
                    };
                    let edge = |pair: PricePair, target| {
                        Ok::<_, DrawingError>(
                            ResolvedLine::new(
                                PixelPoint::new(start_x, scales.price_to_y(pair.start)?),
                                PixelPoint::new(end_x, scales.price_to_y(pair.end)?),
                                stroke,
                            )
                            .target(target)
                            .extended(extend_start, extend_end),
                        )
                    };
                    let upper = edge(channel.upper, AlertTarget::RegressionUpper)?;
                    let middle = edge(channel.middle, AlertTarget::RegressionMiddle)?;
                    let lower = edge(channel.lower, AlertTarget::RegressionLower)?;
                    geometry.region = Some(ResolvedRegion::Polygon(vec![
                        upper.start,
                        upper.end,
                        lower.end,
                        lower.start,
                    ]));
                    geometry.lines.extend([upper, middle, lower]);
                }
            }
            ToolKind::Marker(params) => {
                let center = points[0];
                geometry.region = Some(marker_region(params.shape, center, params.size_px));
                geometry.solid_region = true;
                geometry.lines.push(
                    ResolvedLine::new(
                        PixelPoint::new(bounds.left, center.y),
                        PixelPoint::new(bounds.right, center.y),
                        stroke,
                    )
                    .target(AlertTarget::Line)
                    .extended(true, true)
                    .hidden(),
                );
            }
            ToolKind::Text(params) => {
                if let Some(layout) = self.text_layout() {
                    let origin = points[0];
                    geometry.region = Some(ResolvedRegion::Rect(PixelRect::new(
                        origin.x,
                        origin.y,
                        origin.x + layout.width_px,
                        origin.y + layout.height_px,
                    )));
                    geometry.solid_region = true;
                    for (row, line) in layout.lines.iter().enumerate() {
                        if line.is_empty() {
                            continue;
                        }
                        geometry.labels.push(ResolvedLabel {
                            text: line.clone(),
                            position: PixelPoint::new(
                                origin.x,
                                origin.y + layout.line_height_px * (row as f64 + 1.0),
                            ),
                            h_align: TextHAlign::Left,
                            font_size_px: params.font_size_px,
                            color: stroke.effective_color(),
                        });
                    }
                }
            }
        }

        Ok(geometry)
    }

    fn resolve_parallel_channel(&self, points: &[PixelPoint], geometry: &mut ToolGeometry) {
        // Offset in pixels through the derived anchor; on a log scale a fixed
        // price offset would not stay parallel on screen.
        let dy = points[2].y - (points[0].y + points[1].y) / 2.0;
        let parallel_start = points[0].offset(0.0, dy);
        let parallel_end = points[1].offset(0.0, dy);

        // Screen-upper line first; ties keep the base line as upper.
        let base_is_upper = points[0].y + points[1].y <= parallel_start.y + parallel_end.y;
        let (base_target, parallel_target) = if base_is_upper {
            (AlertTarget::ChannelUpper, AlertTarget::ChannelLower)
        } else {
            (AlertTarget::ChannelLower, AlertTarget::ChannelUpper)
        };
        let stroke = self.style.stroke;
        geometry
            .lines
            .push(ResolvedLine::new(points[0], points[1], stroke).target(base_target));
        geometry.lines.push(
            ResolvedLine::new(parallel_start, parallel_end, stroke).target(parallel_target),
        );
        geometry.region = Some(ResolvedRegion::Polygon(vec![
            points[0],
            points[1],
            parallel_end,
            parallel_start,
        ]));
    }

    fn resolve_retracement(
        &self,
        ctx: ChartContext<'_>,
        params: &FibonacciParams,
        points: &[PixelPoint],
        geometry: &mut ToolGeometry,
    ) -> DrawingResult<()> {
        let start_price = self.anchors[0].price;
        let range = self.anchors[1].price - start_price;
        let left = points[0].x.min(points[1].x);
        let right = points[0].x.max(points[1].x);
        let dashed = self.style.stroke.with_dash(DashStyle::Dash);
        geometry
            .lines
            .push(ResolvedLine::new(points[0], points[1], dashed));
        push_levels(
            ctx,
            params,
            (start_price, range, true),
            (left, right),
            geometry,
        )
    }

    fn resolve_extension(
        &self,
        ctx: ChartContext<'_>,
        params: &FibonacciParams,
        points: &[PixelPoint],
        geometry: &mut ToolGeometry,
    ) -> DrawingResult<()> {
        let range = self.anchors[1].price - self.anchors[0].price;
        let start_price = self.anchors[2].price;
        let left = points.iter().map(|p| OrderedFloat(p.x)).min().map_or(0.0, |x| x.0);
        let right = points.iter().map(|p| OrderedFloat(p.x)).max().map_or(0.0, |x| x.0);
        let dashed = self.style.stroke.with_dash(DashStyle::Dash);
        geometry.lines.push(ResolvedLine::new(points[0], points[1], dashed));
        geometry.lines.push(ResolvedLine::new(points[1], points[2], dashed));
        push_levels(
            ctx,
            params,
            (start_price, range, false),
            (left, right),
            geometry,
        )
    }

    /// Closest anchor within `sensitivity`, else the body, else nothing.
    pub fn hit_test(
        &self,
        point: PixelPoint,
        ctx: ChartContext<'_>,
        sensitivity: f64,
    ) -> DrawingResult<Option<HitTarget>> {
        let geometry = self.resolve_geometry(ctx)?;

        let nearest = geometry
            .anchors
            .iter()
            .enumerate()
            .map(|(index, anchor)| (index, anchor.distance(point)))
            .filter(|(_, distance)| *distance <= sensitivity)
            .min_by_key(|(_, distance)| OrderedFloat(*distance));
        if let Some((index, _)) = nearest {
            return Ok(Some(HitTarget::Anchor(index)));
        }

        let bounds = ctx.scales.bounds();
        if geometry
            .lines
            .iter()
            .filter(|line| line.drawn)
            .any(|line| line.is_near(point, bounds, sensitivity))
        {
            return Ok(Some(HitTarget::Body));
        }

        if let Some(region) = &geometry.region {
            let hit = if geometry.solid_region {
                region.contains(point) || region.is_near_outline(point, sensitivity)
            } else {
                region.is_near_outline(point, sensitivity)
            };
            if hit {
                return Ok(Some(HitTarget::Body));
            }
        }
        Ok(None)
    }
}

fn push_outline(lines: &mut Vec<ResolvedLine>, vertices: &[PixelPoint], stroke: Stroke) {
    let count = vertices.len();
    for index in 0..count {
        let line = ResolvedLine::new(vertices[index], vertices[(index + 1) % count], stroke);
        let horizontal_or_vertical = line.start.x == line.end.x || line.start.y == line.end.y;
        lines.push(if horizontal_or_vertical { line.crisp() } else { line });
    }
}

/// One horizontal line per visible level between `left` and `right`.
fn push_levels(
    ctx: ChartContext<'_>,
    params: &FibonacciParams,
    (start_price, range, invert): (f64, f64, bool),
    (left, right): (f64, f64),
    geometry: &mut ToolGeometry,
) -> DrawingResult<()> {
    for (index, level) in params.levels.iter().enumerate() {
        if !level.is_visible {
            continue;
        }
        let price = level.get_price(start_price, range, invert);
        let y = ctx.scales.price_to_y(price)?;
        geometry.lines.push(
            ResolvedLine::new(PixelPoint::new(left, y), PixelPoint::new(right, y), level.stroke)
                .target(AlertTarget::Level(index))
                .extended(params.extend_left, params.extend_right)
                .crisp(),
        );
        let label_y = level.get_y(ctx.scales, start_price, range, invert)?;
        geometry.labels.push(ResolvedLabel {
            text: format!("{} ({price:.2})", level.display_name()),
            position: PixelPoint::new(left - LABEL_PADDING_PX, label_y - LABEL_PADDING_PX),
            h_align: TextHAlign::Right,
            font_size_px: LABEL_FONT_SIZE_PX,
            color: level.stroke.effective_color(),
        });
    }
    Ok(())
}

fn marker_region(shape: MarkerShape, center: PixelPoint, size: f64) -> ResolvedRegion {
    let half = size / 2.0;
    let quarter = size / 4.0;
    let (x, y) = (center.x, center.y);
    let p = PixelPoint::new;
    match shape {
        MarkerShape::Dot => ResolvedRegion::Ellipse {
            center,
            radius_x: half,
            radius_y: half,
        },
        MarkerShape::Square => {
            ResolvedRegion::Rect(PixelRect::new(x - half, y - half, x + half, y + half))
        }
        MarkerShape::Diamond => ResolvedRegion::Polygon(vec![
            p(x, y - half),
            p(x + half, y),
            p(x, y + half),
            p(x - half, y),
        ]),
        MarkerShape::TriangleUp => {
            ResolvedRegion::Polygon(vec![p(x, y - half), p(x + half, y + half), p(x - half, y + half)])
        }
        MarkerShape::TriangleDown => {
            ResolvedRegion::Polygon(vec![p(x, y + half), p(x - half, y - half), p(x + half, y - half)])
        }
        MarkerShape::ArrowUp => ResolvedRegion::Polygon(vec![
            p(x, y - half),
            p(x + half, y),
            p(x + quarter, y),
            p(x + quarter, y + half),
            p(x - quarter, y + half),
            p(x - quarter, y),
            p(x - half, y),
        ]),
        MarkerShape::ArrowDown => ResolvedRegion::Polygon(vec![
            p(x, y + half),
            p(x - half, y),
            p(x - quarter, y),
            p(x - quarter, y - half),
            p(x + quarter, y - half),
            p(x + quarter, y),
            p(x + half, y),
        ]),
    }
}
