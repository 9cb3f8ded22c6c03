//! Fixed-point ratios: binding anchors stored relative to a shape's box.

use super::snap::bind_point_to_snap_to_element_outline;
use crate::config::{FIXED_BINDING_DISTANCE, FIXED_POINT_EPSILON};
use crate::math::rotate_point;
use crate::scene::ElementsMap;
use crate::shapes::{BindableShape, Connector};
use kurbo::Point;

/// Nudge ratio components sitting on the exact center off it.
///
/// A ratio of exactly 0.5 makes the side a point faces ambiguous, and
/// floating-point noise then flips headings from frame to frame.
pub fn normalize_fixed_point(fixed_point: [f64; 2]) -> [f64; 2] {
    fixed_point.map(|r| {
        if (r - 0.5).abs() < FIXED_POINT_EPSILON {
            0.5001
        } else {
            r
        }
    })
}

/// Gap kept between an orbiting endpoint and the target's outline.
pub fn binding_gap(shape: &BindableShape) -> f64 {
    FIXED_BINDING_DISTANCE + shape.stroke_width / 2.0
}

/// Scene position of a fixed point on a (possibly rotated) shape.
pub fn global_fixed_point_for_bindable(fixed_point: [f64; 2], shape: &BindableShape) -> Point {
    let [fx, fy] = normalize_fixed_point(fixed_point);
    rotate_point(
        Point::new(shape.x + shape.width * fx, shape.y + shape.height * fy),
        shape.center(),
        shape.angle,
    )
}

/// Scene anchors of both connector ends; unbound ends (or ends bound to a
/// shape that no longer exists) use the stored point.
pub fn global_fixed_points_for_connector<M: ElementsMap + ?Sized>(
    connector: &Connector,
    elements: &M,
) -> [Point; 2] {
    [true, false].map(|start| {
        connector
            .binding(start)
            .and_then(|b| {
                elements
                    .bindable(&b.element_id)
                    .map(|shape| global_fixed_point_for_bindable(b.fixed_point, shape))
            })
            .unwrap_or_else(|| connector.endpoint(start))
    })
}

/// Ratio of `point` inside the shape's unrotated box.
fn ratio_in_shape(shape: &BindableShape, point: Point) -> [f64; 2] {
    let unrotated = rotate_point(point, shape.center(), -shape.angle);
    let w = if shape.width == 0.0 { 1.0 } else { shape.width };
    let h = if shape.height == 0.0 { 1.0 } else { shape.height };
    normalize_fixed_point([(unrotated.x - shape.x) / w, (unrotated.y - shape.y) / h])
}

/// Fixed point for an elbow connector end: the endpoint snapped onto the
/// outline first, so the route leaves the shape at a side midpoint when
/// the user aimed near one.
pub fn calculate_fixed_point_for_elbow_arrow_binding(
    connector: &Connector,
    shape: &BindableShape,
    start: bool,
) -> [f64; 2] {
    let snapped = bind_point_to_snap_to_element_outline(connector, shape, start, None);
    ratio_in_shape(shape, snapped)
}

/// Fixed point for a simple connector end: the focus point when one is
/// given, the current endpoint otherwise.
pub fn calculate_fixed_point_for_non_elbow_arrow_binding(
    connector: &Connector,
    shape: &BindableShape,
    start: bool,
    focus_point: Option<Point>,
) -> [f64; 2] {
    let edge = focus_point.unwrap_or_else(|| connector.endpoint(start));
    ratio_in_shape(shape, edge)
}
