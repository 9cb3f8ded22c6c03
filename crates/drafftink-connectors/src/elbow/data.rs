//! Per-route geometry: anchors, headings, obstacle boxes and dongles.

use crate::binding::{
    bind_point_to_snap_to_element_outline, binding_gap, global_fixed_point_for_bindable,
    snap_to_mid,
};
use crate::collision::hovered_element_for_binding;
use crate::config::{BASE_PADDING, FIXED_BINDING_DISTANCE, RouteOptions, max_binding_distance};
use crate::distance::distance_to_shape;
use crate::geometry::{aabb_for_element, is_point_inside_shape};
use crate::heading::{Heading, heading_for_point_from_element, vector_to_heading};
use crate::math::{common_bounds, point_inside_bounds};
use crate::scene::ElementsMap;
use crate::shapes::{BindableShape, Connector};
use kurbo::{Point, Rect, Vec2};

/// Half size of the box standing in for an unbound endpoint.
const POINT_BOUNDS_RADIUS: f64 = 2.0;

/// Slack for the overlap test of the split obstacle boxes.
const SIDE_HACK_EPSILON: f64 = 1e-11;

/// Everything the router needs to know about one route.
#[derive(Debug, Clone)]
pub(crate) struct ElbowArrowData<'a> {
    pub dynamic_aabbs: [Rect; 2],
    pub start_dongle: Point,
    pub start_global: Point,
    pub start_heading: Heading,
    pub end_dongle: Point,
    pub end_global: Point,
    pub end_heading: Heading,
    pub common_bounds: Rect,
    pub hovered_start: Option<&'a BindableShape>,
    pub hovered_end: Option<&'a BindableShape>,
}

/// Grow amounts `[up, right, down, left]` with `head` on the heading side.
pub fn offset_from_heading(heading: Heading, head: f64, side: f64) -> [f64; 4] {
    match heading {
        Heading::Up => [head, side, side, side],
        Heading::Right => [side, head, side, side],
        Heading::Down => [side, side, head, side],
        Heading::Left => [side, side, side, head],
    }
}

/// Where a route leaving `p` along `heading` meets the edge of `bounds`.
pub fn dongle_position(bounds: Rect, heading: Heading, p: Point) -> Point {
    match heading {
        Heading::Up => Point::new(p.x, bounds.y0),
        Heading::Right => Point::new(bounds.x1, p.y),
        Heading::Down => Point::new(p.x, bounds.y1),
        Heading::Left => Point::new(bounds.x0, p.y),
    }
}

/// Padding between the shape and the obstacle box on the exit side.
fn arrowhead_padding(has_arrowhead: bool) -> f64 {
    if has_arrowhead {
        FIXED_BINDING_DISTANCE * 6.0
    } else {
        FIXED_BINDING_DISTANCE * 2.0
    }
}

/// Obstacle boxes for both ends, grown toward each other until they touch.
///
/// `a` and `b` are the minimum extents, `start_diff` and `end_diff` the extra
/// padding per side `[up, right, down, left]`. When the grown boxes would
/// overlap on both axes they are split along the gap between the shapes,
/// unless `disable_side_hack` is set.
#[allow(clippy::too_many_arguments)]
pub fn generate_dynamic_aabbs(
    a: Rect,
    b: Rect,
    common: Rect,
    start_diff: [f64; 4],
    end_diff: [f64; 4],
    disable_side_hack: bool,
    start_element: Option<Rect>,
    end_element: Option<Rect>,
) -> [Rect; 2] {
    let s_el = start_element.unwrap_or(a);
    let e_el = end_element.unwrap_or(b);
    let [start_up, start_right, start_down, start_left] = start_diff;
    let [end_up, end_right, end_down, end_left] = end_diff;

    let first = Rect::new(
        if a.x0 > b.x1 {
            if a.y0 > b.y1 || a.y1 < b.y0 {
                ((s_el.x0 + e_el.x1) / 2.0).min(a.x0 - start_left)
            } else {
                (s_el.x0 + e_el.x1) / 2.0
            }
        } else if a.x0 > b.x0 {
            a.x0 - start_left
        } else {
            common.x0 - start_left
        },
        if a.y0 > b.y1 {
            if a.x0 > b.x1 || a.x1 < b.x0 {
                ((s_el.y0 + e_el.y1) / 2.0).min(a.y0 - start_up)
            } else {
                (s_el.y0 + e_el.y1) / 2.0
            }
        } else if a.y0 > b.y0 {
            a.y0 - start_up
        } else {
            common.y0 - start_up
        },
        if a.x1 < b.x0 {
            if a.y0 > b.y1 || a.y1 < b.y0 {
                ((s_el.x1 + e_el.x0) / 2.0).max(a.x1 + start_right)
            } else {
                (s_el.x1 + e_el.x0) / 2.0
            }
        } else if a.x1 < b.x1 {
            a.x1 + start_right
        } else {
            common.x1 + start_right
        },
        if a.y1 < b.y0 {
            if a.x0 > b.x1 || a.x1 < b.x0 {
                ((s_el.y1 + e_el.y0) / 2.0).max(a.y1 + start_down)
            } else {
                (s_el.y1 + e_el.y0) / 2.0
            }
        } else if a.y1 < b.y1 {
            a.y1 + start_down
        } else {
            common.y1 + start_down
        },
    );
    let second = Rect::new(
        if b.x0 > a.x1 {
            if b.y0 > a.y1 || b.y1 < a.y0 {
                ((e_el.x0 + s_el.x1) / 2.0).min(b.x0 - end_left)
            } else {
                (e_el.x0 + s_el.x1) / 2.0
            }
        } else if b.x0 > a.x0 {
            b.x0 - end_left
        } else {
            common.x0 - end_left
        },
        if b.y0 > a.y1 {
            if b.x0 > a.x1 || b.x1 < a.x0 {
                ((e_el.y0 + s_el.y1) / 2.0).min(b.y0 - end_up)
            } else {
                (e_el.y0 + s_el.y1) / 2.0
            }
        } else if b.y0 > a.y0 {
            b.y0 - end_up
        } else {
            common.y0 - end_up
        },
        if b.x1 < a.x0 {
            if b.y0 > a.y1 || b.y1 < a.y0 {
                ((e_el.x1 + s_el.x0) / 2.0).max(b.x1 + end_right)
            } else {
                (e_el.x1 + s_el.x0) / 2.0
            }
        } else if b.x1 < a.x1 {
            b.x1 + end_right
        } else {
            common.x1 + end_right
        },
        if b.y1 < a.y0 {
            if b.x0 > a.x1 || b.x1 < a.x0 {
                ((e_el.y1 + s_el.y0) / 2.0).max(b.y1 + end_down)
            } else {
                (e_el.y1 + s_el.y0) / 2.0
            }
        } else if b.y1 < a.y1 {
            b.y1 + end_down
        } else {
            common.y1 + end_down
        },
    );

    let c = common_bounds(&[first, second]);
    let overlapping = first.width() + second.width() > c.width() + SIDE_HACK_EPSILON
        && first.height() + second.height() > c.height() + SIDE_HACK_EPSILON;
    if disable_side_hack || !overlapping {
        return [first, second];
    }

    let end_center = second.center();
    let corner = |x: f64, y: f64| Vec2::new(x - end_center.x, y - end_center.y);

    if b.x0 > a.x1 && a.y0 > b.y1 {
        // Bottom left
        let cx = first.x1 + (second.x0 - first.x1) / 2.0;
        let cy = second.y1 + (first.y0 - second.y1) / 2.0;
        if corner(a.x1, a.y0).cross(corner(a.x0, a.y1)) > 0.0 {
            [
                Rect::new(first.x0, first.y0, cx, first.y1),
                Rect::new(cx, second.y0, second.x1, second.y1),
            ]
        } else {
            [
                Rect::new(first.x0, cy, first.x1, first.y1),
                Rect::new(second.x0, second.y0, second.x1, cy),
            ]
        }
    } else if a.x1 < b.x0 && a.y1 < b.y0 {
        // Top left
        let cx = first.x1 + (second.x0 - first.x1) / 2.0;
        let cy = first.y1 + (second.y0 - first.y1) / 2.0;
        if corner(a.x0, a.y0).cross(corner(a.x1, a.y1)) > 0.0 {
            [
                Rect::new(first.x0, first.y0, first.x1, cy),
                Rect::new(second.x0, cy, second.x1, second.y1),
            ]
        } else {
            [
                Rect::new(first.x0, first.y0, cx, first.y1),
                Rect::new(cx, second.y0, second.x1, second.y1),
            ]
        }
    } else if a.x0 > b.x1 && a.y1 < b.y0 {
        // Top right
        let cx = second.x1 + (first.x0 - second.x1) / 2.0;
        let cy = first.y1 + (second.y0 - first.y1) / 2.0;
        if corner(a.x1, a.y0).cross(corner(a.x0, a.y1)) > 0.0 {
            [
                Rect::new(cx, first.y0, first.x1, first.y1),
                Rect::new(second.x0, second.y0, cx, second.y1),
            ]
        } else {
            [
                Rect::new(first.x0, first.y0, first.x1, cy),
                Rect::new(second.x0, cy, second.x1, second.y1),
            ]
        }
    } else if a.x0 > b.x1 && a.y0 > b.y1 {
        // Bottom right
        let cx = second.x1 + (first.x0 - second.x1) / 2.0;
        let cy = second.y1 + (first.y0 - second.y1) / 2.0;
        if corner(a.x0, a.y0).cross(corner(a.x1, a.y1)) > 0.0 {
            [
                Rect::new(cx, first.y0, first.x1, first.y1),
                Rect::new(second.x0, second.y0, cx, second.y1),
            ]
        } else {
            [
                Rect::new(first.x0, cy, first.x1, first.y1),
                Rect::new(second.x0, second.y0, second.x1, cy),
            ]
        }
    } else {
        [first, second]
    }
}

/// Scene anchor of one end.
///
/// While dragging, an endpoint inside its hovered shape snaps onto the
/// outline; otherwise a bound end sits at its fixed point, re-snapped when
/// a resize pulled it off the outline gap.
fn global_point(
    next: &Connector,
    start: bool,
    initial: Point,
    element: Option<&BindableShape>,
    is_dragging: bool,
) -> Point {
    let Some(element) = element else {
        return initial;
    };

    if is_dragging {
        if is_point_inside_shape(element, initial) {
            let snapped = bind_point_to_snap_to_element_outline(next, element, start, None);
            return snap_to_mid(element, snapped);
        }
        return initial;
    }

    let fixed_point = next.binding(start).map_or([0.0, 0.0], |b| b.fixed_point);
    let fixed = global_fixed_point_for_bindable(fixed_point, element);
    if (distance_to_shape(element, fixed) - binding_gap(element)).abs() > 0.01 {
        bind_point_to_snap_to_element_outline(next, element, start, None)
    } else {
        fixed
    }
}

/// Direction the route must leave (or enter) an anchor in.
fn bind_point_heading(
    p: Point,
    other: Point,
    element: Option<&BindableShape>,
    original: Point,
) -> Heading {
    let Some(element) = element else {
        return vector_to_heading(other - p);
    };

    let distance = distance_to_shape(element, original);
    if distance > max_binding_distance(1.0) || distance == 0.0 {
        return vector_to_heading(p - element.center());
    }

    let grow = distance_to_shape(element, p);
    heading_for_point_from_element(element, aabb_for_element(element, [grow; 4]), p)
}

fn point_bounds(p: Point) -> Rect {
    Rect::new(
        p.x - POINT_BOUNDS_RADIUS,
        p.y - POINT_BOUNDS_RADIUS,
        p.x + POINT_BOUNDS_RADIUS,
        p.y + POINT_BOUNDS_RADIUS,
    )
}

/// Gather routing geometry for `arrow` with `next_points` (local) as its
/// prospective points.
pub(crate) fn elbow_arrow_data<'a, M: ElementsMap + ?Sized>(
    arrow: &Connector,
    elements: &'a M,
    next_points: &[Point],
    options: RouteOptions,
) -> ElbowArrowData<'a> {
    let origin = Vec2::new(arrow.x, arrow.y);
    let first = next_points.first().copied().unwrap_or(Point::ZERO);
    let last = next_points.last().copied().unwrap_or(first);
    let orig_start = first + origin;
    let orig_end = last + origin;

    let (hovered_start, hovered_end) = if options.is_dragging {
        let distance = max_binding_distance(options.zoom);
        (
            hovered_element_for_binding(orig_start, elements, distance),
            hovered_element_for_binding(orig_end, elements, distance),
        )
    } else {
        (
            arrow.start_binding.and_then(|b| elements.bindable(&b.element_id)),
            arrow.end_binding.and_then(|b| elements.bindable(&b.element_id)),
        )
    };

    let mut next = arrow.clone();
    next.elbowed = true;
    next.points = next_points.to_vec();

    let start_global = global_point(&next, true, orig_start, hovered_start, options.is_dragging);
    let end_global = global_point(&next, false, orig_end, hovered_end, options.is_dragging);
    let start_heading = bind_point_heading(start_global, end_global, hovered_start, orig_start);
    let end_heading = bind_point_heading(end_global, start_global, hovered_end, orig_end);

    let start_point_bounds = point_bounds(start_global);
    let end_point_bounds = point_bounds(end_global);
    let start_padding = arrowhead_padding(arrow.start_arrowhead.is_some());
    let end_padding = arrowhead_padding(arrow.end_arrowhead.is_some());

    let start_element_bounds = hovered_start.map_or(start_point_bounds, |el| {
        aabb_for_element(el, offset_from_heading(start_heading, start_padding, 1.0))
    });
    let end_element_bounds = hovered_end.map_or(end_point_bounds, |el| {
        aabb_for_element(el, offset_from_heading(end_heading, end_padding, 1.0))
    });

    let bounds_overlap = point_inside_bounds(
        start_global,
        hovered_end.map_or(end_point_bounds, |el| {
            aabb_for_element(el, offset_from_heading(end_heading, BASE_PADDING, BASE_PADDING))
        }),
    ) || point_inside_bounds(
        end_global,
        hovered_start.map_or(start_point_bounds, |el| {
            aabb_for_element(el, offset_from_heading(start_heading, BASE_PADDING, BASE_PADDING))
        }),
    );

    let (start_bounds, end_bounds) = if bounds_overlap {
        (start_point_bounds, end_point_bounds)
    } else {
        (start_element_bounds, end_element_bounds)
    };
    let common = common_bounds(&[start_bounds, end_bounds]);

    let none_hovered = hovered_start.is_none() && hovered_end.is_none();
    let diff = |heading: Heading, padding: f64| {
        if bounds_overlap {
            offset_from_heading(heading, if none_hovered { 0.0 } else { BASE_PADDING }, 0.0)
        } else {
            offset_from_heading(
                heading,
                if none_hovered { 0.0 } else { BASE_PADDING - padding },
                BASE_PADDING,
            )
        }
    };

    let dynamic_aabbs = generate_dynamic_aabbs(
        start_bounds,
        end_bounds,
        common,
        diff(start_heading, start_padding),
        diff(end_heading, end_padding),
        bounds_overlap,
        hovered_start.map(|el| aabb_for_element(el, [0.0; 4])),
        hovered_end.map(|el| aabb_for_element(el, [0.0; 4])),
    );

    ElbowArrowData {
        start_dongle: dongle_position(dynamic_aabbs[0], start_heading, start_global),
        end_dongle: dongle_position(dynamic_aabbs[1], end_heading, end_global),
        dynamic_aabbs,
        start_global,
        start_heading,
        end_global,
        end_heading,
        common_bounds: common,
        hovered_start,
        hovered_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use crate::shapes::{Binding, BindingMode, SerializableColor, ShapeKind};

    #[test]
    fn test_offset_from_heading() {
        assert_eq!(offset_from_heading(Heading::Up, 9.0, 1.0), [9.0, 1.0, 1.0, 1.0]);
        assert_eq!(offset_from_heading(Heading::Left, 9.0, 1.0), [1.0, 1.0, 1.0, 9.0]);
    }

    #[test]
    fn test_dongle_position() {
        let b = Rect::new(0.0, 0.0, 100.0, 50.0);
        let p = Point::new(40.0, 20.0);
        assert_eq!(dongle_position(b, Heading::Up, p), Point::new(40.0, 0.0));
        assert_eq!(dongle_position(b, Heading::Right, p), Point::new(100.0, 20.0));
        assert_eq!(dongle_position(b, Heading::Down, p), Point::new(40.0, 50.0));
        assert_eq!(dongle_position(b, Heading::Left, p), Point::new(0.0, 20.0));
    }

    #[test]
    fn test_dynamic_aabbs_meet_between_side_by_side_shapes() {
        let a = Rect::new(-1.0, -1.0, 110.0, 101.0);
        let b = Rect::new(270.0, -1.0, 401.0, 101.0);
        let common = common_bounds(&[a, b]);
        let [first, second] = generate_dynamic_aabbs(
            a,
            b,
            common,
            [40.0, 30.0, 40.0, 40.0],
            [40.0, 40.0, 40.0, 10.0],
            false,
            Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
            Some(Rect::new(300.0, 0.0, 400.0, 100.0)),
        );
        assert_eq!(first, Rect::new(-41.0, -41.0, 200.0, 141.0));
        assert_eq!(second, Rect::new(200.0, -41.0, 441.0, 141.0));
    }

    #[test]
    fn test_dynamic_aabbs_split_diagonal_neighbours() {
        // Start box above-left of the end box, grown into each other.
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(120.0, 120.0, 220.0, 220.0);
        let common = common_bounds(&[a, b]);
        let pad = [40.0; 4];
        let [first, second] = generate_dynamic_aabbs(a, b, common, pad, pad, false, None, None);
        let overlap = first.intersect(second);
        assert!(overlap.width() <= 1e-9 || overlap.height() <= 1e-9);

        // Without the split the boxes keep overlapping.
        let [first, second] = generate_dynamic_aabbs(a, b, common, pad, pad, true, None, None);
        let overlap = first.intersect(second);
        assert!(overlap.width() > 0.0 && overlap.height() > 0.0);
    }

    #[test]
    fn test_data_for_bound_ends() {
        let mut scene = Scene::new();
        let r1 = BindableShape::new(ShapeKind::Rectangle, 0.0, 0.0, 100.0, 100.0);
        let r2 = BindableShape::new(ShapeKind::Rectangle, 300.0, 0.0, 100.0, 100.0);
        let (r1, r2) = (scene.add_element(r1), scene.add_element(r2));
        let mut c = Connector::new_elbow(Point::new(106.0, 49.9), Point::new(294.0, 49.9));
        c.start_binding = Some(Binding {
            element_id: r1,
            mode: BindingMode::Orbit,
            fixed_point: [1.06, 0.499],
        });
        c.end_binding = Some(Binding {
            element_id: r2,
            mode: BindingMode::Orbit,
            fixed_point: [-0.06, 0.499],
        });
        let points = c.points.clone();
        let data = elbow_arrow_data(&c, &scene, &points, RouteOptions::default());
        assert_eq!(data.start_heading, Heading::Right);
        assert_eq!(data.end_heading, Heading::Left);
        assert!((data.start_global.x - 106.0).abs() < 1e-9);
        assert!((data.end_global.x - 294.0).abs() < 1e-9);
        assert!((data.start_dongle.x - 200.0).abs() < 1e-9);
        assert!((data.end_dongle.x - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_dragged_end_inside_filled_shape_snaps_to_side_midpoint() {
        let mut scene = Scene::new();
        scene.add_element(
            BindableShape::new(ShapeKind::Rectangle, 300.0, 0.0, 100.0, 100.0)
                .with_background(SerializableColor::white()),
        );
        let c = Connector::new_elbow(Point::new(0.0, 50.0), Point::new(200.0, 50.0));
        let points = vec![Point::ZERO, c.local_point(Point::new(320.0, 47.0))];
        let options = RouteOptions {
            is_dragging: true,
            zoom: 1.0,
        };
        let data = elbow_arrow_data(&c, &scene, &points, options);
        assert!(data.hovered_end.is_some());
        assert!(data.hovered_start.is_none());
        // Gap is the binding distance plus half the 2px stroke.
        assert!(data.end_global.distance(Point::new(294.0, 50.0)) < 1e-9);
        assert_eq!(data.end_heading, Heading::Left);

        // Released, the same end stays where it was dropped.
        let data = elbow_arrow_data(&c, &scene, &points, RouteOptions::default());
        assert!(data.hovered_end.is_none());
        assert!(data.end_global.distance(Point::new(320.0, 47.0)) < 1e-9);
    }

    #[test]
    fn test_unbound_heading_points_at_other_end() {
        let scene = Scene::new();
        let c = Connector::new_elbow(Point::new(0.0, 0.0), Point::new(0.0, 200.0));
        let points = c.points.clone();
        let data = elbow_arrow_data(&c, &scene, &points, RouteOptions::default());
        assert_eq!(data.start_heading, Heading::Down);
        assert_eq!(data.end_heading, Heading::Up);
        assert!(data.hovered_start.is_none());
    }
}
