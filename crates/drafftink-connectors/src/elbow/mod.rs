//! Orthogonal routing for elbow connectors.
//!
//! [`recompute_elbow_route`] is the single entry point: given a connector and
//! what changed (endpoints, fixed segments, bindings) it returns the new
//! geometry, or `None` when nothing should change. Routes are computed on a
//! sparse grid with A* (see [`route`]), and user-pinned fixed segments are
//! preserved through the handlers in [`segments`].

mod data;
mod route;
mod segments;

pub use data::{dongle_position, generate_dynamic_aabbs, offset_from_heading};
pub use route::estimate_segment_count;

use crate::config::{DEDUP_THRESHOLD, RouteOptions};
use crate::error::{ConnectorError, invariant};
use crate::math::{bounds_of_points, clamp_coord, clamp_point, in_range};
use crate::scene::ElementsMap;
use crate::shapes::{Binding, Connector, ElementUpdate, FixedSegment};
use data::elbow_arrow_data;
use kurbo::Point;
use route::route_elbow_arrow;
use segments::{
    handle_endpoint_drag, handle_segment_move, handle_segment_release,
    handle_segment_renormalization,
};

/// What changed on an elbow connector.
///
/// `None` means "unchanged"; the nested options carry an explicit clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElbowUpdates {
    /// New local points: either the full list or just `[first, last]`.
    pub points: Option<Vec<Point>>,
    pub fixed_segments: Option<Option<Vec<FixedSegment>>>,
    pub start_binding: Option<Option<Binding>>,
    pub end_binding: Option<Option<Binding>>,
}

impl ElbowUpdates {
    pub fn with_points(points: Vec<Point>) -> Self {
        Self {
            points: Some(points),
            ..Default::default()
        }
    }

    pub fn with_fixed_segments(fixed_segments: Vec<FixedSegment>) -> Self {
        Self {
            fixed_segments: Some(Some(fixed_segments)),
            ..Default::default()
        }
    }

    fn fixed(&self) -> Option<&[FixedSegment]> {
        self.fixed_segments.as_ref().and_then(|s| s.as_deref())
    }
}

/// Normalized geometry of a rerouted connector: the first point is always
/// local `(0, 0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteUpdate {
    pub x: f64,
    pub y: f64,
    pub points: Vec<Point>,
    pub width: f64,
    pub height: f64,
    pub fixed_segments: Option<Vec<FixedSegment>>,
    pub start_is_special: Option<bool>,
    pub end_is_special: Option<bool>,
}

impl RouteUpdate {
    /// The connector's current geometry with `fixed_segments` swapped in.
    fn keep(connector: &Connector, fixed_segments: Option<Vec<FixedSegment>>) -> Self {
        let extents = bounds_of_points(&connector.points);
        Self {
            x: connector.x,
            y: connector.y,
            points: connector.points.clone(),
            width: extents.width(),
            height: extents.height(),
            fixed_segments,
            start_is_special: connector.start_is_special,
            end_is_special: connector.end_is_special,
        }
    }
}

impl From<RouteUpdate> for ElementUpdate {
    fn from(route: RouteUpdate) -> Self {
        ElementUpdate {
            x: Some(route.x),
            y: Some(route.y),
            width: Some(route.width),
            height: Some(route.height),
            points: Some(route.points),
            fixed_segments: Some(route.fixed_segments),
            start_is_special: Some(route.start_is_special),
            end_is_special: Some(route.end_is_special),
            ..Default::default()
        }
    }
}

/// Whether every segment is axis-aligned within `tolerance`.
pub fn validate_elbow_points(points: &[Point], tolerance: f64) -> bool {
    points
        .windows(2)
        .all(|w| (w[1].x - w[0].x).abs() < tolerance || (w[1].y - w[0].y).abs() < tolerance)
}

/// Turn scene points into connector geometry anchored at the first point.
///
/// Coordinates are clamped to the supported range; an out-of-range input
/// is logged first.
pub fn normalize_arrow_element_update(
    global: &[Point],
    fixed_segments: Vec<FixedSegment>,
    start_is_special: Option<bool>,
    end_is_special: Option<bool>,
) -> RouteUpdate {
    let offset = global.first().copied().unwrap_or(Point::ZERO);
    let points: Vec<Point> = global.iter().map(|p| *p - offset.to_vec2()).collect();

    let out_of_range = !in_range(offset.x)
        || !in_range(offset.y)
        || points
            .last()
            .is_some_and(|p| !in_range(offset.x + p.x) || !in_range(offset.y + p.y));
    if out_of_range {
        log::error!(
            "elbow connector normalization is out of bounds: origin {offset:?}, {} points",
            points.len()
        );
    }

    let points: Vec<Point> = points.into_iter().map(clamp_point).collect();
    let extents = bounds_of_points(&points);
    RouteUpdate {
        x: clamp_coord(offset.x),
        y: clamp_coord(offset.y),
        width: extents.width(),
        height: extents.height(),
        points,
        fixed_segments: (!fixed_segments.is_empty()).then_some(fixed_segments),
        start_is_special,
        end_is_special,
    }
}

/// Drop interior points that do not change direction.
pub fn corner_points(points: &[Point]) -> Vec<Point> {
    if points.len() <= 1 {
        return points.to_vec();
    }

    let is_horizontal = |a: Point, b: Point| (a.y - b.y).abs() < (a.x - b.x).abs();
    let last = points.len() - 1;
    let mut previous_horizontal = is_horizontal(points[0], points[1]);
    points
        .iter()
        .enumerate()
        .filter(|&(idx, p)| {
            if idx == 0 || idx == last {
                return true;
            }
            let next_horizontal = is_horizontal(*p, points[idx + 1]);
            let keep = previous_horizontal != next_horizontal;
            previous_horizontal = next_horizontal;
            keep
        })
        .map(|(_, p)| *p)
        .collect()
}

/// Drop interior points closer than the dedup threshold to their
/// predecessor. Routes of fewer than four points are left alone.
pub fn remove_short_segments(points: &[Point]) -> Vec<Point> {
    if points.len() < 4 {
        return points.to_vec();
    }
    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .filter(|&(idx, p)| {
            idx == 0 || idx == last || points[idx - 1].distance(*p) > DEDUP_THRESHOLD
        })
        .map(|(_, p)| *p)
        .collect()
}

/// Route through the grid and simplify. `None` when no path exists.
fn route_and_simplify<M: ElementsMap + ?Sized>(
    arrow: &Connector,
    elements: &M,
    next_points: &[Point],
    start_bound: bool,
    options: RouteOptions,
) -> Option<Vec<Point>> {
    let data = elbow_arrow_data(arrow, elements, next_points, options);
    let route = route_elbow_arrow(&data, start_bound)?;
    Some(corner_points(&remove_short_segments(&route)))
}

fn check_preconditions(connector: &Connector, updates: &ElbowUpdates) -> bool {
    let points = invariant(
        updates.points.as_ref().is_none_or(|p| p.len() >= 2),
        ConnectorError::InvalidElbowPoints,
    );
    let diagonal = connector
        .fixed_segments()
        .iter()
        .chain(updates.fixed().unwrap_or(&[]))
        .find(|s| s.start.x != s.end.x && s.start.y != s.end.y);
    let segments = match diagonal {
        Some(s) => invariant(false, ConnectorError::NonOrthogonalFixedSegment { index: s.index }),
        None => Ok(()),
    };
    points.is_ok() && segments.is_ok()
}

/// Recompute an elbow connector's geometry after `updates`.
///
/// Returns `None` when nothing changes: a no-op update, a route that could
/// not be found, or a violated precondition in release builds.
pub fn recompute_elbow_route<M: ElementsMap + ?Sized>(
    connector: &Connector,
    elements: &M,
    updates: &ElbowUpdates,
    options: RouteOptions,
) -> Option<RouteUpdate> {
    if connector.points.len() < 2 {
        return None;
    }

    let mut arrow = connector.clone();
    let mut updates = updates.clone();

    let last_update = updates.points.as_ref().and_then(|p| p.last().copied());
    let last_point = arrow.points.last().copied().unwrap_or(Point::ZERO);
    let in_bounds = [arrow.x, arrow.y].into_iter().all(in_range)
        && last_update.is_none_or(|p| in_range(arrow.x + p.x) && in_range(arrow.y + p.y))
        && in_range(arrow.x + last_point.x)
        && in_range(arrow.y + last_point.y);
    if !in_bounds {
        log::error!(
            "elbow connector {} (or its update) is outside reasonable bounds",
            arrow.id()
        );
    }
    arrow.x = clamp_coord(arrow.x);
    arrow.y = clamp_coord(arrow.y);
    if let Some(points) = updates.points.as_mut() {
        points.iter_mut().for_each(|p| *p = clamp_point(*p));
    }

    if !check_preconditions(&arrow, &updates) {
        return None;
    }

    let fixed: Vec<FixedSegment> = updates
        .fixed()
        .map(<[FixedSegment]>::to_vec)
        .unwrap_or_else(|| arrow.fixed_segments().to_vec());

    let updated_points: Vec<Point> = match &updates.points {
        Some(points) if points.len() == 2 => {
            let last = arrow.points.len() - 1;
            arrow
                .points
                .iter()
                .enumerate()
                .map(|(idx, p)| match idx {
                    0 => points[0],
                    i if i == last => points[1],
                    _ => *p,
                })
                .collect()
        }
        Some(points) => points.clone(),
        None => arrow.points.clone(),
    };

    let start_binding = updates.start_binding.unwrap_or(arrow.start_binding);
    let end_binding = updates.end_binding.unwrap_or(arrow.end_binding);
    let start_element = start_binding.and_then(|b| elements.bindable(&b.element_id));
    let end_element = end_binding.and_then(|b| elements.bindable(&b.element_id));
    let points_valid = validate_elbow_points(&updated_points, DEDUP_THRESHOLD);
    let scene_empty = elements.ordered().next().is_none();
    let only_bindings_changed = updates.points.is_none() && updates.fixed_segments.is_none();
    let binding_lost = (start_binding.is_some() && start_element.is_none())
        || (end_binding.is_some() && end_element.is_none());

    // Bound shapes are gone: keep the points, just renormalize.
    let stale = (binding_lost || scene_empty) && points_valid;
    if stale || (only_bindings_changed && binding_lost) {
        if binding_lost {
            log::warn!("elbow connector {} is bound to a missing shape", arrow.id());
        }
        let globals: Vec<Point> = updated_points.iter().map(|p| arrow.global_point(*p)).collect();
        return Some(normalize_arrow_element_update(
            &globals,
            arrow.fixed_segments().to_vec(),
            arrow.start_is_special,
            arrow.end_is_special,
        ));
    }

    let mut state = arrow.clone();
    state.start_binding = start_binding;
    state.end_binding = end_binding;

    // 1. Nothing but a re-layout was requested.
    if updates.points.is_none()
        && updates.fixed().is_none()
        && updates.start_binding.flatten().is_none()
        && updates.end_binding.flatten().is_none()
    {
        return handle_segment_renormalization(&arrow, elements, options);
    }

    let unchanged = updates.start_binding == Some(arrow.start_binding)
        && updates.end_binding == Some(arrow.end_binding)
        && updates
            .points
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .all(|(i, p)| arrow.points.get(i) == Some(p))
        && points_valid;
    if unchanged {
        return None;
    }

    let data = elbow_arrow_data(&state, elements, &updated_points, options);

    // 2. Plain routing.
    if fixed.is_empty() {
        let route = route_elbow_arrow(&data, arrow.start_binding.is_some())?;
        let simplified = corner_points(&remove_short_segments(&route));
        return Some(normalize_arrow_element_update(&simplified, fixed, None, None));
    }

    // 3. A fixed segment was released.
    if arrow.fixed_segments().len() > fixed.len() {
        return handle_segment_release(&arrow, &fixed, elements, options);
    }

    // 4. A fixed segment was dragged.
    if updates.points.is_none() {
        return Some(handle_segment_move(
            &arrow,
            fixed,
            data.start_heading,
            data.end_heading,
            data.hovered_start.is_some(),
            data.hovered_end.is_some(),
        ));
    }

    // 5. Resize: both the points and the segments are already final.
    if updates.fixed().is_some() {
        let extents = bounds_of_points(&updated_points);
        return Some(RouteUpdate {
            x: arrow.x,
            y: arrow.y,
            points: updated_points,
            width: extents.width(),
            height: extents.height(),
            fixed_segments: Some(fixed),
            start_is_special: arrow.start_is_special,
            end_is_special: arrow.end_is_special,
        });
    }

    // 6. Endpoints moved while segments are pinned.
    Some(handle_endpoint_drag(&arrow, &updated_points, &fixed, &data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MutableScene, Scene};
    use crate::shapes::{BindableShape, BindingMode, ConnectorKind, ElementId, ShapeKind};
    use kurbo::Rect;

    fn square(x: f64, y: f64) -> BindableShape {
        BindableShape::new(ShapeKind::Rectangle, x, y, 100.0, 100.0)
    }

    fn orbit(element_id: ElementId, fixed_point: [f64; 2]) -> Option<Binding> {
        Some(Binding {
            element_id,
            mode: BindingMode::Orbit,
            fixed_point,
        })
    }

    /// Two 100x100 rectangles side by side, joined by a bound elbow
    /// connector from R1's right side to R2's left side.
    fn side_by_side() -> (Scene, ElementId, ElementId, ElementId) {
        let mut scene = Scene::new();
        let r1 = scene.add_element(square(0.0, 0.0));
        let r2 = scene.add_element(square(300.0, 0.0));
        let mut c = Connector::new_elbow(Point::new(106.0, 49.9), Point::new(294.0, 49.9));
        c.start_binding = orbit(r1, [1.06, 0.499]);
        c.end_binding = orbit(r2, [-0.06, 0.499]);
        let id = scene.add_element(c);
        (scene, r1, r2, id)
    }

    fn routed(scene: &mut Scene, id: ElementId) -> RouteUpdate {
        let c = scene.connector(&id).cloned().unwrap();
        let points = vec![c.points[0], c.points[c.points.len() - 1]];
        let updates = ElbowUpdates::with_points(points);
        let route = recompute_elbow_route(&c, &*scene, &updates, RouteOptions::default()).unwrap();
        scene.mutate_element(&id, &route.clone().into());
        route
    }

    fn globals(route: &RouteUpdate) -> Vec<Point> {
        route
            .points
            .iter()
            .map(|p| Point::new(route.x + p.x, route.y + p.y))
            .collect()
    }

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-6
    }

    #[test]
    fn test_validate_elbow_points() {
        assert!(validate_elbow_points(
            &[Point::ZERO, Point::new(10.0, 0.5), Point::new(10.0, 40.0)],
            1.0
        ));
        assert!(!validate_elbow_points(&[Point::ZERO, Point::new(10.0, 10.0)], 1.0));
        assert!(validate_elbow_points(&[Point::ZERO], 1.0));
    }

    #[test]
    fn test_normalize_anchors_at_first_point() {
        let update = normalize_arrow_element_update(
            &[Point::new(10.0, 20.0), Point::new(10.0, 80.0), Point::new(50.0, 80.0)],
            Vec::new(),
            Some(true),
            None,
        );
        assert_eq!((update.x, update.y), (10.0, 20.0));
        assert_eq!(update.points[0], Point::ZERO);
        assert_eq!(update.points[2], Point::new(40.0, 60.0));
        assert_eq!((update.width, update.height), (40.0, 60.0));
        assert!(update.fixed_segments.is_none());
        assert_eq!(update.start_is_special, Some(true));
    }

    #[test]
    fn test_normalize_clamps_runaway_coordinates() {
        let update = normalize_arrow_element_update(
            &[Point::new(2e6, 0.0), Point::new(2e6, 3e6)],
            Vec::new(),
            None,
            None,
        );
        assert_eq!(update.x, 1e6);
        assert_eq!(update.points[1].y, 1e6);
    }

    #[test]
    fn test_corner_points_and_short_segments() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 50.0),
        ];
        assert_eq!(
            corner_points(&points),
            vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 50.0)]
        );

        let points = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 0.5),
            Point::new(100.0, 0.5),
        ];
        assert_eq!(
            remove_short_segments(&points),
            vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(100.0, 0.5)]
        );
        // Three points or fewer are never touched.
        assert_eq!(remove_short_segments(&points[..3]).len(), 3);
    }

    #[test]
    fn test_side_by_side_shapes_route_straight() {
        let (mut scene, _, _, id) = side_by_side();
        let route = routed(&mut scene, id);
        let points = globals(&route);
        assert_eq!(points.len(), 2);
        assert!(close(points[0], Point::new(106.0, 49.9)));
        assert!(close(points[1], Point::new(294.0, 49.9)));
        assert!(route.fixed_segments.is_none());
        assert_eq!(route.start_is_special, None);
    }

    #[test]
    fn test_route_leaves_and_enters_perpendicular() {
        let mut scene = Scene::new();
        let r1 = scene.add_element(square(0.0, 0.0));
        let r2 = scene.add_element(square(300.0, 300.0));
        // R1 right side to R2 top side.
        let mut c = Connector::new_elbow(Point::new(106.0, 49.9), Point::new(349.9, 294.0));
        c.start_binding = orbit(r1, [1.06, 0.499]);
        c.end_binding = orbit(r2, [0.499, -0.06]);
        let id = scene.add_element(c);

        let route = routed(&mut scene, id);
        let points = globals(&route);
        assert!(validate_elbow_points(&points, 1.0));
        assert!(close(points[0], Point::new(106.0, 49.9)));
        assert!(close(*points.last().unwrap(), Point::new(349.9, 294.0)));
        // Leaves R1 to the right and enters R2 from above.
        assert!(points[1].x > points[0].x && (points[1].y - points[0].y).abs() < 1e-9);
        let n = points.len();
        assert!(points[n - 2].y < points[n - 1].y);
        assert!((points[n - 2].x - points[n - 1].x).abs() < 1e-9);
    }

    #[test]
    fn test_route_goes_around_the_far_shape() {
        let mut scene = Scene::new();
        let r1 = scene.add_element(square(0.0, 0.0));
        let r2 = scene.add_element(square(300.0, 0.0));
        // Ends on R2's right side, so the route has to wrap around R2.
        let mut c = Connector::new_elbow(Point::new(106.0, 49.9), Point::new(406.0, 49.9));
        c.start_binding = orbit(r1, [1.06, 0.499]);
        c.end_binding = orbit(r2, [1.06, 0.499]);
        let id = scene.add_element(c);

        let route = routed(&mut scene, id);
        let points = globals(&route);
        assert!(validate_elbow_points(&points, 1.0));
        assert!(points.len() > 3);
        let crosses = |a: Point, b: Point, r: Rect| {
            let s = Rect::from_points(a, b);
            s.x0 < r.x1 && s.x1 > r.x0 && s.y0 < r.y1 && s.y1 > r.y0
        };
        for w in points.windows(2) {
            for shape in [Rect::new(0.0, 0.0, 100.0, 100.0), Rect::new(300.0, 0.0, 400.0, 100.0)] {
                assert!(!crosses(w[0], w[1], shape), "segment {w:?} crosses {shape:?}");
            }
        }
        let n = points.len();
        // Enters R2's right side moving left.
        assert!(points[n - 2].x > points[n - 1].x);
    }

    #[test]
    fn test_no_op_update_returns_none() {
        let (mut scene, _, _, id) = side_by_side();
        routed(&mut scene, id);
        let c = scene.connector(&id).cloned().unwrap();
        let updates = ElbowUpdates {
            points: Some(c.points.clone()),
            start_binding: Some(c.start_binding),
            end_binding: Some(c.end_binding),
            ..Default::default()
        };
        assert!(recompute_elbow_route(&c, &scene, &updates, RouteOptions::default()).is_none());
    }

    #[test]
    fn test_missing_shape_only_renormalizes() {
        let (mut scene, r1, _, id) = side_by_side();
        scene.remove_element(r1);
        let c = scene.connector(&id).cloned().unwrap();
        let update = recompute_elbow_route(
            &c,
            &scene,
            &ElbowUpdates::with_points(vec![Point::ZERO, Point::new(188.0, 0.0)]),
            RouteOptions::default(),
        )
        .unwrap();
        assert_eq!(update.points, vec![Point::ZERO, Point::new(188.0, 0.0)]);
        assert_eq!((update.x, update.y), (106.0, 49.9));
    }

    #[test]
    fn test_segment_move_then_shape_move_keeps_fixed_segment() {
        let (mut scene, _, r2, id) = side_by_side();
        routed(&mut scene, id);

        // Drag the only segment 20px down.
        let c = scene.connector(&id).cloned().unwrap();
        let moved = FixedSegment::new(1, Point::new(0.0, 20.0), Point::new(188.0, 20.0));
        let route = recompute_elbow_route(
            &c,
            &scene,
            &ElbowUpdates::with_fixed_segments(vec![moved]),
            RouteOptions::default(),
        )
        .unwrap();
        scene.mutate_element(&id, &route.clone().into());
        let points = globals(&route);
        assert!(validate_elbow_points(&points, 1.0));
        assert_eq!(route.start_is_special, Some(false));
        let fixed = route.fixed_segments.clone().unwrap();
        assert_eq!(fixed.len(), 1);
        let fixed_start = Point::new(route.x + fixed[0].start.x, route.y + fixed[0].start.y);
        let fixed_end = Point::new(route.x + fixed[0].end.x, route.y + fixed[0].end.y);
        assert!(close(fixed_start, Point::new(146.0, 69.9)));
        assert!(close(fixed_end, Point::new(254.0, 69.9)));
        assert!(close(points[fixed[0].index - 1], fixed_start));

        // R2 moves up by 50; the end follows its fixed point.
        scene.mutate_element(
            &r2,
            &ElementUpdate {
                y: Some(-50.0),
                ..Default::default()
            },
        );
        let c = scene.connector(&id).cloned().unwrap();
        let mut next = c.points.clone();
        let end = c.local_point(Point::new(294.0, -0.1));
        *next.last_mut().unwrap() = end;
        let updates = ElbowUpdates::with_points(next);
        let route = recompute_elbow_route(&c, &scene, &updates, RouteOptions::default()).unwrap();
        let points = globals(&route);
        assert!(validate_elbow_points(&points, 1.0));
        assert!(close(*points.last().unwrap(), Point::new(294.0, -0.1)));
        let fixed = route.fixed_segments.unwrap();
        let fixed_start = Point::new(route.x + fixed[0].start.x, route.y + fixed[0].start.y);
        let fixed_end = Point::new(route.x + fixed[0].end.x, route.y + fixed[0].end.y);
        assert!(close(fixed_start, Point::new(146.0, 69.9)));
        assert!(close(fixed_end, Point::new(254.0, 69.9)));
        assert!(close(points[fixed[0].index - 1], fixed_start));
        assert!(close(points[fixed[0].index], fixed_end));
    }

    #[test]
    fn test_resize_accepts_points_and_segments() {
        let (scene, _, _, id) = side_by_side();
        let c = scene.connector(&id).cloned().unwrap();
        let points = vec![Point::ZERO, Point::new(0.0, 40.0), Point::new(200.0, 40.0)];
        let segments = vec![FixedSegment::new(2, Point::new(0.0, 40.0), Point::new(200.0, 40.0))];
        let updates = ElbowUpdates {
            points: Some(points.clone()),
            fixed_segments: Some(Some(segments.clone())),
            ..Default::default()
        };
        let route = recompute_elbow_route(&c, &scene, &updates, RouteOptions::default()).unwrap();
        assert_eq!(route.points, points);
        assert_eq!(route.fixed_segments, Some(segments));
    }

    #[test]
    fn test_single_point_connector_is_left_alone() {
        let scene = Scene::new();
        let mut c = Connector::new_elbow(Point::ZERO, Point::new(10.0, 0.0));
        c.points.truncate(1);
        let updates = ElbowUpdates::default();
        assert!(recompute_elbow_route(&c, &scene, &updates, RouteOptions::default()).is_none());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "not axis-aligned"))]
    fn test_diagonal_fixed_segment_is_rejected() {
        let (scene, _, _, id) = side_by_side();
        let c = scene.connector(&id).cloned().unwrap();
        let diagonal = FixedSegment::new(1, Point::ZERO, Point::new(10.0, 10.0));
        let updates = ElbowUpdates::with_fixed_segments(vec![diagonal]);
        assert!(recompute_elbow_route(&c, &scene, &updates, RouteOptions::default()).is_none());
    }

    #[test]
    fn test_start_parallel_to_pinned_segment_gets_stub() {
        let mut scene = Scene::new();
        let r1 = scene.add_element(square(0.0, 0.0));
        let r2 = scene.add_element(square(300.0, 200.0));
        let mut c = Connector::from_points(
            ConnectorKind::Arrow,
            &[
                Point::new(106.0, 49.9),
                Point::new(200.0, 49.9),
                Point::new(200.0, 249.9),
                Point::new(294.0, 249.9),
            ],
        );
        c.elbowed = true;
        c.start_binding = orbit(r1, [1.06, 0.499]);
        c.end_binding = orbit(r2, [-0.06, 0.499]);
        c.start_is_special = Some(false);
        c.end_is_special = Some(false);
        let (start, end) = (c.points[1], c.points[2]);
        c.fixed_segments = Some(vec![FixedSegment::new(2, start, end)]);
        let id = scene.add_element(c);

        // Rebind the start to R1's bottom side: it now leaves downwards,
        // parallel to the pinned vertical run.
        let c = scene.connector(&id).cloned().unwrap();
        let updates = ElbowUpdates {
            points: Some(vec![c.local_point(Point::new(49.9, 106.0)), c.points[3]]),
            start_binding: Some(orbit(r1, [0.499, 1.06])),
            ..Default::default()
        };
        let route = recompute_elbow_route(&c, &scene, &updates, RouteOptions::default()).unwrap();
        scene.mutate_element(&id, &route.clone().into());
        let points = globals(&route);
        assert!(validate_elbow_points(&points, 1.0));
        assert_eq!(route.start_is_special, Some(true));
        assert_eq!(points.len(), 5);
        assert!(close(points[0], Point::new(49.9, 106.0)));
        assert!(close(points[1], Point::new(49.9, 146.0)));
        assert!(close(points[2], Point::new(200.0, 146.0)));
        let fixed = route.fixed_segments.clone().unwrap();
        assert_eq!(fixed[0].index, 3);
        let fixed_start = Point::new(route.x + fixed[0].start.x, route.y + fixed[0].start.y);
        assert!(close(points[2], fixed_start));
        assert!((route.x + fixed[0].end.x - 200.0).abs() < 1e-6);
        assert!(close(*points.last().unwrap(), Point::new(294.0, 249.9)));

        // Back on the right side the stub goes away again.
        let c = scene.connector(&id).cloned().unwrap();
        let updates = ElbowUpdates {
            points: Some(vec![c.local_point(Point::new(106.0, 49.9)), c.points[4]]),
            start_binding: Some(orbit(r1, [1.06, 0.499])),
            ..Default::default()
        };
        let route = recompute_elbow_route(&c, &scene, &updates, RouteOptions::default()).unwrap();
        let points = globals(&route);
        assert!(validate_elbow_points(&points, 1.0));
        assert_eq!(route.start_is_special, Some(false));
        assert_eq!(points.len(), 4);
        assert!(close(points[1], Point::new(200.0, 49.9)));
        let fixed = route.fixed_segments.unwrap();
        assert_eq!(fixed[0].index, 2);
        assert!((route.x + fixed[0].start.x - 200.0).abs() < 1e-6);
        assert!((route.x + fixed[0].end.x - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_dragged_end_snaps_into_filled_shape() {
        let mut scene = Scene::new();
        scene.add_element(
            square(300.0, 0.0)
                .with_background(crate::shapes::SerializableColor::white()),
        );
        let c = Connector::new_elbow(Point::new(0.0, 50.0), Point::new(200.0, 50.0));
        let end = c.local_point(Point::new(320.0, 47.0));
        let updates = ElbowUpdates::with_points(vec![Point::ZERO, end]);
        let options = RouteOptions {
            is_dragging: true,
            zoom: 1.0,
        };
        let route = recompute_elbow_route(&c, &scene, &updates, options).unwrap();
        let points = globals(&route);
        assert!(validate_elbow_points(&points, 1.0));
        assert!(close(points[0], Point::new(0.0, 50.0)));
        assert!(close(*points.last().unwrap(), Point::new(294.0, 50.0)));
    }

    #[test]
    fn test_unbound_route_headings() {
        let mut scene = Scene::new();
        let c = Connector::new_elbow(Point::new(0.0, 0.0), Point::new(200.0, 100.0));
        let id = scene.add_element(c);
        let route = routed(&mut scene, id);
        let points = globals(&route);
        assert!(validate_elbow_points(&points, 1.0));
        assert!(close(points[0], Point::ZERO));
        assert!(close(*points.last().unwrap(), Point::new(200.0, 100.0)));
    }
}
