//! Distance from a point to an element's outline.

use crate::geometry::{deconstruct, ellipse_distance};
use crate::math::rotate_point;
use crate::shapes::{BindableShape, Connector, Element, Freedraw, ShapeKind};
use kurbo::{ParamCurveNearest, PathSeg, Point};

const NEAREST_ACCURACY: f64 = 1e-6;

/// Euclidean distance from `point` to the element's outline.
///
/// Always finite and non-negative; an element without geometry reports 0.
pub fn distance_to_element(element: &Element, point: Point) -> f64 {
    let d = match element {
        Element::Shape(shape) => distance_to_shape(shape, point),
        Element::Connector(connector) => distance_to_connector(connector, point),
        Element::Freedraw(freedraw) => distance_to_freedraw(freedraw, point),
    };
    if d.is_finite() { d.max(0.0) } else { 0.0 }
}

/// Distance to a bindable shape's rotated outline.
pub fn distance_to_shape(shape: &BindableShape, point: Point) -> f64 {
    let center = shape.center();
    let local = rotate_point(point, center, -shape.angle);
    match shape.kind {
        ShapeKind::Ellipse => {
            ellipse_distance(local - center.to_vec2(), shape.width / 2.0, shape.height / 2.0)
        }
        _ => min_distance(deconstruct(shape, 0.0).segments(), local),
    }
}

/// Distance to a connector's drawn geometry (already in scene space).
pub fn distance_to_connector(connector: &Connector, point: Point) -> f64 {
    min_distance(connector.segments().into_iter(), point)
}

pub fn distance_to_freedraw(freedraw: &Freedraw, point: Point) -> f64 {
    freedraw.distance_to(point)
}

fn min_distance(segments: impl Iterator<Item = PathSeg>, point: Point) -> f64 {
    segments
        .map(|seg| seg.nearest(point, NEAREST_ACCURACY).distance_sq.sqrt())
        .fold(f64::INFINITY, f64::min)
}
