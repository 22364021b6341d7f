//! Pixel-space geometry shared by hit testing, visibility and alerts.
//!
//! Every function here is pure and total: degenerate or non-finite input
//! yields a defined answer instead of `NaN` or a panic.

use serde::{Deserialize, Serialize};

use crate::core::{PixelPoint, PixelRect};

/// Tolerance below which a point counts as lying on a line.
pub const ON_LINE_EPSILON_PX: f64 = 1e-9;

const RAY_PARAMETER_EPSILON: f64 = 1e-12;

/// Side of a line a point lies on, in screen orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSide {
    LeftOrAbove,
    RightOrBelow,
    OnLine,
}

/// Point where the ray `from -> through` leaves `bounds`.
///
/// Returns `through` unchanged when the ray is degenerate, points away from
/// the bounds, or `through` already lies on the exit boundary.
#[must_use]
pub fn extended_point(from: PixelPoint, through: PixelPoint, bounds: PixelRect) -> PixelPoint {
    let dx = through.x - from.x;
    let dy = through.y - from.y;
    if !from.is_finite() || !through.is_finite() || (dx == 0.0 && dy == 0.0) {
        return through;
    }

    let t_x = far_slab_parameter(from.x, dx, bounds.left, bounds.right);
    let t_y = far_slab_parameter(from.y, dy, bounds.top, bounds.bottom);
    let t = t_x.min(t_y);
    if !t.is_finite() || t <= 0.0 || (t - 1.0).abs() <= RAY_PARAMETER_EPSILON {
        return through;
    }

    let mut point = PixelPoint::new(from.x + dx * t, from.y + dy * t);
    // Pin the exit coordinate exactly onto the boundary.
    if t == t_x {
        point.x = if dx > 0.0 { bounds.right } else { bounds.left };
    }
    if t == t_y {
        point.y = if dy > 0.0 { bounds.bottom } else { bounds.top };
    }
    point
}

fn far_slab_parameter(origin: f64, delta: f64, min: f64, max: f64) -> f64 {
    if delta == 0.0 {
        return f64::INFINITY;
    }
    let t1 = (min - origin) / delta;
    let t2 = (max - origin) / delta;
    t1.max(t2)
}

/// Signed perpendicular distance of `point` from the directed line
/// `start -> end`. Negative means left of the direction of travel in screen
/// space. Swapping the endpoints flips the sign.
#[must_use]
pub fn signed_distance_to_line(start: PixelPoint, end: PixelPoint, point: PixelPoint) -> f64 {
    let length = start.distance(end);
    if !length.is_finite() || length == 0.0 || !point.is_finite() {
        return 0.0;
    }
    let cross = (end.x - start.x) * (point.y - start.y) - (end.y - start.y) * (point.x - start.x);
    cross / length
}

/// Classifies `point` against the line through `line_start` and `line_end`.
///
/// The endpoint with the lower x is always treated as the start (for vertical
/// lines, the lower one on screen), so the answer does not depend on which
/// endpoint was placed first.
#[must_use]
pub fn point_line_side(line_start: PixelPoint, line_end: PixelPoint, point: PixelPoint) -> LineSide {
    point_line_side_with_tolerance(line_start, line_end, point, ON_LINE_EPSILON_PX)
}

#[must_use]
pub fn point_line_side_with_tolerance(
    line_start: PixelPoint,
    line_end: PixelPoint,
    point: PixelPoint,
    tolerance: f64,
) -> LineSide {
    let (start, end) = normalized_endpoints(line_start, line_end);
    let distance = signed_distance_to_line(start, end, point);
    if !distance.is_finite() || distance.abs() <= tolerance.abs() {
        LineSide::OnLine
    } else if distance < 0.0 {
        LineSide::LeftOrAbove
    } else {
        LineSide::RightOrBelow
    }
}

fn normalized_endpoints(a: PixelPoint, b: PixelPoint) -> (PixelPoint, PixelPoint) {
    let swap = a.x > b.x || (a.x == b.x && a.y < b.y);
    if swap { (b, a) } else { (a, b) }
}

/// `true` when `point` is within `tolerance` of the segment
/// `origin -> origin + vector` and its projection lies inside that segment.
#[must_use]
pub fn is_point_along_vector(
    point: PixelPoint,
    origin: PixelPoint,
    vector: PixelPoint,
    tolerance: f64,
) -> bool {
    let tolerance = tolerance.abs();
    if !point.is_finite() || !origin.is_finite() || !vector.is_finite() {
        return false;
    }
    let length_sq = vector.x * vector.x + vector.y * vector.y;
    let rel_x = point.x - origin.x;
    let rel_y = point.y - origin.y;
    if length_sq == 0.0 {
        return rel_x.hypot(rel_y) <= tolerance;
    }

    let t = (rel_x * vector.x + rel_y * vector.y) / length_sq;
    if !(0.0..=1.0).contains(&t) {
        return false;
    }
    let cross = vector.x * rel_y - vector.y * rel_x;
    cross.abs() / length_sq.sqrt() <= tolerance
}

/// Shortest distance from `point` to the segment `a-b`.
#[must_use]
pub fn distance_to_segment(point: PixelPoint, a: PixelPoint, b: PixelPoint) -> f64 {
    let vx = b.x - a.x;
    let vy = b.y - a.y;
    let length_sq = vx * vx + vy * vy;
    if length_sq == 0.0 {
        return point.distance(a);
    }
    let t = (((point.x - a.x) * vx + (point.y - a.y) * vy) / length_sq).clamp(0.0, 1.0);
    point.distance(PixelPoint::new(a.x + vx * t, a.y + vy * t))
}

/// Inclusive ellipse containment. A zero radius collapses the ellipse onto a
/// segment (one radius zero) or onto its center (both zero).
#[must_use]
pub fn is_point_inside_ellipse(
    center: PixelPoint,
    point: PixelPoint,
    radius_x: f64,
    radius_y: f64,
) -> bool {
    if !center.is_finite() || !point.is_finite() || !radius_x.is_finite() || !radius_y.is_finite() {
        return false;
    }
    let rx = radius_x.abs();
    let ry = radius_y.abs();
    let dx = point.x - center.x;
    let dy = point.y - center.y;

    match (rx == 0.0, ry == 0.0) {
        (true, true) => dx == 0.0 && dy == 0.0,
        (true, false) => dx == 0.0 && dy.abs() <= ry,
        (false, true) => dy == 0.0 && dx.abs() <= rx,
        (false, false) => (dx / rx).powi(2) + (dy / ry).powi(2) <= 1.0,
    }
}

/// Inclusive triangle containment. Colinear vertices degrade to a test
/// against the triangle's edges.
#[must_use]
pub fn is_point_inside_triangle(point: PixelPoint, a: PixelPoint, b: PixelPoint, c: PixelPoint) -> bool {
    if !point.is_finite() || !a.is_finite() || !b.is_finite() || !c.is_finite() {
        return false;
    }
    let area2 = cross(a, b, c);
    if area2.abs() <= ON_LINE_EPSILON_PX {
        return [(a, b), (b, c), (c, a)]
            .into_iter()
            .any(|(from, to)| distance_to_segment(point, from, to) <= ON_LINE_EPSILON_PX);
    }

    let d1 = cross(point, a, b);
    let d2 = cross(point, b, c);
    let d3 = cross(point, c, a);
    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_negative && has_positive)
}

/// Inclusive containment in a simple (possibly concave) polygon, even-odd rule.
#[must_use]
pub fn is_point_inside_polygon(point: PixelPoint, vertices: &[PixelPoint]) -> bool {
    match vertices.len() {
        0 => false,
        1 => point == vertices[0],
        2 => distance_to_segment(point, vertices[0], vertices[1]) <= ON_LINE_EPSILON_PX,
        3 => is_point_inside_triangle(point, vertices[0], vertices[1], vertices[2]),
        len => {
            let mut inside = false;
            let mut j = len - 1;
            for i in 0..len {
                let (vi, vj) = (vertices[i], vertices[j]);
                if distance_to_segment(point, vi, vj) <= ON_LINE_EPSILON_PX {
                    return true;
                }
                if (vi.y > point.y) != (vj.y > point.y)
                    && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
                {
                    inside = !inside;
                }
                j = i;
            }
            inside
        }
    }
}

fn cross(p: PixelPoint, a: PixelPoint, b: PixelPoint) -> f64 {
    (p.x - b.x) * (a.y - b.y) - (a.x - b.x) * (p.y - b.y)
}

/// Rotates `point` around `origin` onto the nearest multiple of
/// `step_degrees`, keeping its distance from `origin`.
#[must_use]
pub fn snap_to_angle(origin: PixelPoint, point: PixelPoint, step_degrees: f64) -> PixelPoint {
    let dx = point.x - origin.x;
    let dy = point.y - origin.y;
    let length = dx.hypot(dy);
    if !step_degrees.is_finite() || step_degrees <= 0.0 || length == 0.0 || !length.is_finite() {
        return point;
    }
    let step = step_degrees.to_radians();
    let angle = (dy.atan2(dx) / step).round() * step;
    PixelPoint::new(
        origin.x + clean_zero(angle.cos()) * length,
        origin.y + clean_zero(angle.sin()) * length,
    )
}

fn clean_zero(value: f64) -> f64 {
    if value.abs() < 1e-12 { 0.0 } else { value }
}

/// Moves a coordinate onto the nearest pixel center so 1px strokes render crisp.
#[must_use]
pub fn align_half_pixel(value: f64) -> f64 {
    value.floor() + 0.5
}
