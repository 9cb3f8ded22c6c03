//! Hit testing for binding targets.

use crate::distance::distance_to_shape;
use crate::geometry::is_point_inside_shape;
use crate::scene::ElementsMap;
use crate::shapes::{BindableShape, ShapeKind};
use kurbo::Point;

pub use crate::config::max_binding_distance;

/// Whether a shape accepts a binding at `point`.
///
/// Filled shapes accept points anywhere in their body; transparent shapes
/// and frames only near their outline.
pub fn is_hovered_for_binding(shape: &BindableShape, point: Point, max_distance: f64) -> bool {
    if distance_to_shape(shape, point) <= max_distance {
        return true;
    }
    shape.kind != ShapeKind::Frame && shape.is_filled() && is_point_inside_shape(shape, point)
}

/// The shape a connector endpoint at `point` would bind to.
///
/// When several shapes qualify, one hit on its outline wins; otherwise the
/// smallest one does, front-most on ties.
pub fn hovered_element_for_binding<M: ElementsMap + ?Sized>(
    point: Point,
    elements: &M,
    max_distance: f64,
) -> Option<&BindableShape> {
    let candidates: Vec<&BindableShape> = elements
        .bindables_front_to_back()
        .into_iter()
        .filter(|s| is_hovered_for_binding(s, point, max_distance))
        .collect();

    if candidates.len() <= 1 {
        return candidates.first().copied();
    }

    let on_border: Vec<&BindableShape> = candidates
        .iter()
        .copied()
        .filter(|s| distance_to_shape(s, point) <= max_distance)
        .collect();
    if on_border.len() == 1 {
        return Some(on_border[0]);
    }

    candidates.into_iter().min_by(|a, b| {
        (a.width * a.height)
            .partial_cmp(&(b.width * b.height))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Every bindable shape containing `point` or near its outline, front to
/// back, regardless of fill.
pub fn all_hovered_elements_at_point<M: ElementsMap + ?Sized>(
    point: Point,
    elements: &M,
    max_distance: f64,
) -> Vec<&BindableShape> {
    elements
        .bindables_front_to_back()
        .into_iter()
        .filter(|s| is_point_inside_shape(s, point) || distance_to_shape(s, point) <= max_distance)
        .collect()
}
