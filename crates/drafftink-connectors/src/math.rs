//! Small geometric helpers shared by the binding and routing code.

use crate::config::MAX_POS;
use kurbo::{Affine, Point, Rect, Vec2};

/// Rotate `point` around `center` by `angle` radians.
pub fn rotate_point(point: Point, center: Point, angle: f64) -> Point {
    if angle == 0.0 {
        return point;
    }
    Affine::rotate_about(angle, center) * point
}

/// Strict containment: points on the border are outside.
pub fn point_inside_bounds(point: Point, bounds: Rect) -> bool {
    point.x > bounds.x0 && point.x < bounds.x1 && point.y > bounds.y0 && point.y < bounds.y1
}

/// Inclusive overlap test between two boxes.
pub fn bounds_intersect(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

pub fn manhattan(a: Point, b: Point) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Grow a box by `[up, right, down, left]`.
pub fn expand_rect(rect: Rect, offset: [f64; 4]) -> Rect {
    Rect::new(
        rect.x0 - offset[3],
        rect.y0 - offset[0],
        rect.x1 + offset[1],
        rect.y1 + offset[2],
    )
}

/// Bounding box of a point list; zero-sized at the origin when empty.
pub fn bounds_of_points(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

/// Smallest box containing all of `rects`.
pub fn common_bounds(rects: &[Rect]) -> Rect {
    rects
        .iter()
        .skip(1)
        .fold(rects.first().copied().unwrap_or(Rect::ZERO), |acc, r| {
            acc.union(*r)
        })
}

/// Unit vector, or zero for a zero-length input.
pub fn normalize(v: Vec2) -> Vec2 {
    let len = v.hypot();
    if len == 0.0 { Vec2::ZERO } else { v / len }
}

/// Whether a coordinate is within the supported range.
pub fn in_range(v: f64) -> bool {
    v.is_finite() && (-MAX_POS..=MAX_POS).contains(&v)
}

/// Clamp a coordinate into the supported range.
pub fn clamp_coord(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(-MAX_POS, MAX_POS)
}

pub fn clamp_point(p: Point) -> Point {
    Point::new(clamp_coord(p.x), clamp_coord(p.y))
}

/// Point halfway along a polyline, measured by arc length.
pub fn polyline_midpoint(points: &[Point]) -> Point {
    let total: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    let mut remaining = total / 2.0;
    for w in points.windows(2) {
        let len = w[0].distance(w[1]);
        if len > 0.0 && remaining <= len {
            return w[0].lerp(w[1], remaining / len);
        }
        remaining -= len;
    }
    points.first().copied().unwrap_or(Point::ZERO)
}
