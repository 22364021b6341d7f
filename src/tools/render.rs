use crate::core::{ChartContext, PixelPoint};
use crate::error::DrawingResult;
use crate::geometry::align_half_pixel;
use crate::render::{DrawingFrame, EllipsePrimitive, LinePrimitive, PolygonPrimitive, TextPrimitive};
use crate::style::Color;

use super::{DrawingTool, ResolvedLine, ResolvedRegion, ToolKind};

const HANDLE_RADIUS_PX: f64 = 4.0;
const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

impl DrawingTool {
    /// Appends this tool's primitives to `frame`.
    ///
    /// May run several times per frame (display and hit-test passes); it never
    /// touches anchors or levels.
    pub fn render_into(&self, ctx: ChartContext<'_>, frame: &mut DrawingFrame) -> DrawingResult<()> {
        let geometry = self.resolve_geometry(ctx)?;
        let bounds = ctx.scales.bounds();
        let stroke = self.style.stroke;

        if let Some(region) = &geometry.region {
            let fill = match self.kind() {
                ToolKind::Marker(_) => Some(stroke.effective_color()),
                _ => self
                    .style
                    .area
                    .filter(|area| area.is_visible())
                    .map(|area| area.effective_color()),
            };
            match region {
                ResolvedRegion::Ellipse {
                    center,
                    radius_x,
                    radius_y,
                } => frame.ellipses.push(EllipsePrimitive {
                    center: *center,
                    radius_x: *radius_x,
                    radius_y: *radius_y,
                    stroke_width: stroke.width,
                    stroke_color: stroke.effective_color(),
                    fill_color: fill,
                }),
                ResolvedRegion::Polygon(points) => {
                    if let Some(color) = fill {
                        frame.polygons.push(PolygonPrimitive::new(points.clone(), color));
                    }
                }
                ResolvedRegion::Rect(rect) => {
                    if let Some(color) = fill {
                        frame
                            .polygons
                            .push(PolygonPrimitive::new(rect.corners().to_vec(), color));
                    }
                }
            }
        }

        for line in geometry.lines.iter().filter(|line| line.drawn) {
            let (start, end) = line.visible_endpoints(bounds);
            frame.lines.push(line_primitive(line, start, end));
        }

        if matches!(self.kind(), ToolKind::ArrowLine) {
            if let [start, end] = geometry.anchors.as_slice() {
                push_arrow_head(frame, *start, *end, stroke.width, stroke.effective_color());
            }
        }

        for label in &geometry.labels {
            frame.texts.push(TextPrimitive::new(
                label.text.clone(),
                label.position.x,
                label.position.y,
                label.font_size_px,
                label.color,
                label.h_align,
            ));
        }

        if self.selected {
            for point in &geometry.anchors {
                frame.ellipses.push(EllipsePrimitive {
                    center: *point,
                    radius_x: HANDLE_RADIUS_PX,
                    radius_y: HANDLE_RADIUS_PX,
                    stroke_width: 1.0,
                    stroke_color: stroke.effective_color(),
                    fill_color: Some(Color::rgb(1.0, 1.0, 1.0)),
                });
            }
        }
        Ok(())
    }
}

fn line_primitive(line: &ResolvedLine, mut start: PixelPoint, mut end: PixelPoint) -> LinePrimitive {
    if line.crisp {
        if start.y == end.y {
            start.y = align_half_pixel(start.y);
            end.y = start.y;
        }
        if start.x == end.x {
            start.x = align_half_pixel(start.x);
            end.x = start.x;
        }
    }
    LinePrimitive::between(start, end, line.stroke.width, line.stroke.effective_color())
        .with_dash(line.stroke.dash)
}

fn push_arrow_head(frame: &mut DrawingFrame, start: PixelPoint, end: PixelPoint, width: f64, color: Color) {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx == 0.0 && dy == 0.0 {
        return;
    }
    let length = 10.0 + 2.0 * width;
    let heading = dy.atan2(dx) + std::f64::consts::PI;
    for side in [-ARROW_HEAD_ANGLE, ARROW_HEAD_ANGLE] {
        let angle = heading + side;
        let tip = end.offset(angle.cos() * length, angle.sin() * length);
        frame.lines.push(LinePrimitive::between(end, tip, width, color));
    }
}
