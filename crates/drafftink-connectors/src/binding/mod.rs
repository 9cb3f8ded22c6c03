//! Attaching connector ends to shapes and keeping them attached.
//!
//! [`resolve_binding_strategy`] decides what a drag means for each end;
//! [`apply_binding_strategy`] writes the decision. [`propagate_shape_move`]
//! pulls bound ends along when a shape moves or resizes. All writes go
//! through a [`StagedScene`] and are committed in one batch.

mod fixed_point;
mod snap;
mod strategy;
mod visitor;

pub use fixed_point::{
    binding_gap, calculate_fixed_point_for_elbow_arrow_binding,
    calculate_fixed_point_for_non_elbow_arrow_binding, global_fixed_point_for_bindable,
    global_fixed_points_for_connector, normalize_fixed_point,
};
pub use snap::{
    avoid_rectangular_corner, bind_point_to_snap_to_element_outline, snap_to_center, snap_to_mid,
};
pub use strategy::{BindingStrategies, BindingStrategy, resolve_binding_strategy};
pub use visitor::{
    BindableElement, BindingProp, BoundElement, binding_targets, fix_bindings_after_deletion,
    fix_bindings_after_duplication,
};

use crate::config::{
    BindingConfig, BindingOptions, MIN_SIMPLE_ARROW_LENGTH, PropagateOptions, RouteOptions,
};
use crate::elbow::{ElbowUpdates, recompute_elbow_route};
use crate::error::{ConnectorError, ConnectorResult};
use crate::geometry::{aabb_for_element, intersect_element_with_line_segment};
use crate::math::{
    bounds_intersect, bounds_of_points, normalize, polyline_midpoint, rotate_point,
};
use crate::scene::{ElementsMap, MutableScene, StagedScene, commit};
use crate::shapes::{
    BindableShape, Binding, BindingMode, BoundElementKind, BoundElementRef, Connector, ElementId,
    ElementUpdate,
};
use kurbo::{Line, Point, Vec2};
use std::collections::BTreeMap;

fn end_index(connector: &Connector, start: bool) -> usize {
    if start { 0 } else { connector.points.len().saturating_sub(1) }
}

fn binding_prop(start: bool) -> BindingProp {
    if start {
        BindingProp::StartBinding
    } else {
        BindingProp::EndBinding
    }
}

/// Bind one end of a connector to a shape and register the back reference.
///
/// Elbow connectors always orbit. Simple connectors take their fixed point
/// from `focus_point` when one is given.
pub fn bind_binding_element<S: MutableScene + ?Sized>(
    scene: &mut S,
    connector_id: ElementId,
    shape_id: ElementId,
    mode: BindingMode,
    start: bool,
    focus_point: Option<Point>,
) -> ConnectorResult<()> {
    let connector = scene
        .connector(&connector_id)
        .cloned()
        .ok_or(ConnectorError::MissingElement(connector_id))?;
    let shape = scene
        .bindable(&shape_id)
        .cloned()
        .ok_or(ConnectorError::MissingElement(shape_id))?;

    let binding = if connector.elbowed {
        Binding {
            element_id: shape_id,
            mode: BindingMode::Orbit,
            fixed_point: calculate_fixed_point_for_elbow_arrow_binding(&connector, &shape, start),
        }
    } else {
        Binding {
            element_id: shape_id,
            mode,
            fixed_point: calculate_fixed_point_for_non_elbow_arrow_binding(
                &connector,
                &shape,
                start,
                focus_point,
            ),
        }
    };

    // Moving to another shape drops the old back reference first.
    if connector.binding(start).is_some_and(|b| b.element_id != shape_id) {
        unbind_binding_element(scene, connector_id, start);
    }

    let mut update = ElementUpdate::default();
    if start {
        update.start_binding = Some(Some(binding));
    } else {
        update.end_binding = Some(Some(binding));
    }
    scene.mutate_element(&connector_id, &update);

    if !shape.bound_elements.iter().any(|b| b.id == connector_id) {
        let mut bound = shape.bound_elements;
        bound.push(BoundElementRef::arrow(connector_id));
        scene.mutate_element(
            &shape_id,
            &ElementUpdate {
                bound_elements: Some(bound),
                ..Default::default()
            },
        );
    }
    log::debug!("bound connector {connector_id} to {shape_id} ({:?})", binding.mode);
    Ok(())
}

/// Clear one end's binding. Returns the shape it was bound to.
///
/// The shape keeps its back reference while the other end is still bound
/// to it.
pub fn unbind_binding_element<S: MutableScene + ?Sized>(
    scene: &mut S,
    connector_id: ElementId,
    start: bool,
) -> Option<ElementId> {
    let (bound_id, other_id) = {
        let connector = scene.connector(&connector_id)?;
        (
            connector.binding(start)?.element_id,
            connector.binding(!start).map(|b| b.element_id),
        )
    };

    if other_id != Some(bound_id) {
        let remaining = scene.get(&bound_id).and_then(|shape| {
            let refs = shape.bound_elements();
            let kept: Vec<BoundElementRef> =
                refs.iter().filter(|b| b.id != connector_id).copied().collect();
            (kept.len() != refs.len()).then_some(kept)
        });
        if let Some(kept) = remaining {
            scene.mutate_element(
                &bound_id,
                &ElementUpdate {
                    bound_elements: Some(kept),
                    ..Default::default()
                },
            );
        }
    }

    scene.mutate_element(&connector_id, &binding_prop(start).cleared());
    Some(bound_id)
}

/// `other`'s diagonal squared minus `shape`'s.
fn compare_element_area(shape: &BindableShape, other: &BindableShape) -> f64 {
    let diagonal = |s: &BindableShape| s.width * s.width + s.height * s.height;
    diagonal(other) - diagonal(shape)
}

fn nearest_to(points: Vec<Point>, target: Point) -> Option<Point> {
    points
        .into_iter()
        .min_by(|a, b| a.distance_squared(target).total_cmp(&b.distance_squared(target)))
}

/// A straight two-point connector bound at both ends whose visible part
/// between the two outlines would be shorter than the minimum.
///
/// Only measurable when the line between the focus points crosses both
/// outlines; otherwise the connector is never too short.
fn arrow_too_short<M: ElementsMap + ?Sized>(connector: &Connector, elements: &M) -> bool {
    if connector.elbowed || connector.points.len() != 2 {
        return false;
    }
    let (Some(start), Some(end)) = (connector.start_binding, connector.end_binding) else {
        return false;
    };
    let start_shape = elements.bindable(&start.element_id);
    let end_shape = elements.bindable(&end.element_id);
    let (Some(start_shape), Some(end_shape)) = (start_shape, end_shape) else {
        return false;
    };
    let start_focus = global_fixed_point_for_bindable(start.fixed_point, start_shape);
    let end_focus = global_fixed_point_for_bindable(end.fixed_point, end_shape);
    let segment = Line::new(start_focus, end_focus);
    let start_hits = intersect_element_with_line_segment(start_shape, segment, 0.0);
    let end_hits = intersect_element_with_line_segment(end_shape, segment, 0.0);
    match (nearest_to(start_hits, end_focus), nearest_to(end_hits, start_focus)) {
        (Some(start_hit), Some(end_hit)) => start_hit.distance(end_hit) < MIN_SIMPLE_ARROW_LENGTH,
        _ => false,
    }
}

/// New local position of a bound end after its shape changed.
///
/// `None` when `binding` is absent or does not point at `shape`.
/// Orbiting ends land on the outline plus the binding gap, unless the two
/// bound shapes overlap (or the connector is too short) and this shape is
/// the larger one; then the raw fixed point is used.
pub fn update_bound_point<M: ElementsMap + ?Sized>(
    connector: &Connector,
    start: bool,
    binding: Option<&Binding>,
    shape: &BindableShape,
    elements: &M,
) -> Option<Point> {
    let binding = binding?;
    if binding.element_id != shape.id() || connector.points.len() < 2 {
        return None;
    }

    let global = global_fixed_point_for_bindable(binding.fixed_point, shape);
    if binding.mode == BindingMode::Inside {
        return Some(connector.local_point(global));
    }

    let nested = connector
        .binding(!start)
        .and_then(|b| elements.bindable(&b.element_id))
        .is_some_and(|other| {
            let is_larger = compare_element_area(shape, other) < if start { 0.0 } else { 1.0 };
            let aabb = |s: &BindableShape| aabb_for_element(s, [0.0; 4]);
            let overlapping = bounds_intersect(aabb(shape), aabb(other));
            is_larger && (overlapping || arrow_too_short(connector, elements))
        });
    if nested {
        return Some(connector.local_point(global));
    }

    let index = end_index(connector, start);
    let mut candidate = connector.clone();
    candidate.points[index] = connector.local_point(global);

    let intersector = (!connector.elbowed).then(|| {
        let adjacent_index = if start { 1 } else { index - 1 };
        let adjacent = connector.global_point(connector.points[adjacent_index]);
        let edge = if shape.kind.is_rectanguloid() {
            avoid_rectangular_corner(shape, global)
        } else {
            global
        };
        let half = normalize(edge - adjacent)
            * (edge.distance(adjacent) + shape.width.max(shape.height) + binding_gap(shape) * 2.0);
        Line::new(adjacent + half, adjacent - half)
    });

    let outline = bind_point_to_snap_to_element_outline(&candidate, shape, start, intersector);
    Some(connector.local_point(outline))
}

/// Options for [`move_connector_points`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovePointsOptions {
    /// Inner points travel with the element instead of staying put.
    pub move_mid_points_with_element: bool,
    pub route: RouteOptions,
}

/// Move connector points to new local positions (index to point).
///
/// Elbow connectors are rerouted from their new endpoints. Other
/// connectors are re-anchored so the first point stays at local `(0, 0)`.
/// Returns false when nothing was written.
pub fn move_connector_points<S: MutableScene + ?Sized>(
    scene: &mut S,
    connector_id: ElementId,
    updates: &BTreeMap<usize, Point>,
    options: MovePointsOptions,
) -> bool {
    let Some(connector) = scene.connector(&connector_id).cloned() else {
        return false;
    };
    let n = connector.points.len();
    if n < 2 {
        return false;
    }

    if connector.elbowed {
        let first = updates.get(&0).copied().unwrap_or(connector.points[0]);
        let last = updates.get(&(n - 1)).copied().unwrap_or(connector.points[n - 1]);
        let route = recompute_elbow_route(
            &connector,
            &*scene,
            &ElbowUpdates::with_points(vec![first, last]),
            options.route,
        );
        return match route {
            Some(route) => scene.mutate_element(&connector_id, &route.into()),
            None => false,
        };
    }

    if updates.is_empty() {
        return false;
    }

    let offset: Vec2 = updates.get(&0).map_or(Vec2::ZERO, |p| *p - connector.points[0]);
    let next: Vec<Point> = connector
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let current = updates.get(&i).copied().unwrap_or(*p);
            let is_mid = i != 0 && i != n - 1;
            if options.move_mid_points_with_element && is_mid && !updates.contains_key(&i) {
                current
            } else {
                current - offset
            }
        })
        .collect();

    let prev = bounds_of_points(&connector.points);
    let ext = bounds_of_points(&next);
    let shift = rotate_point(
        offset.to_point(),
        (prev.center() - ext.center()).to_point(),
        connector.angle,
    );

    scene.mutate_element(
        &connector_id,
        &ElementUpdate {
            x: Some(connector.x + shift.x),
            y: Some(connector.y + shift.y),
            width: Some(ext.width()),
            height: Some(ext.height()),
            points: Some(next),
            ..Default::default()
        },
    )
}

/// Center a connector's text label on its path midpoint.
pub fn reposition_bound_label<S: MutableScene + ?Sized>(
    scene: &mut S,
    connector_id: ElementId,
) -> bool {
    let Some(connector) = scene.connector(&connector_id) else {
        return false;
    };
    let Some(label_ref) = connector
        .bound_elements
        .iter()
        .find(|b| b.kind == BoundElementKind::Text)
    else {
        return false;
    };
    let mid = polyline_midpoint(&connector.global_points());
    let label_id = label_ref.id;
    let Some(label) = scene.bindable(&label_id) else {
        return false;
    };
    let (x, y) = (mid.x - label.width / 2.0, mid.y - label.height / 2.0);
    if (label.x - x).abs() < f64::EPSILON && (label.y - y).abs() < f64::EPSILON {
        return false;
    }
    scene.mutate_element(
        &label_id,
        &ElementUpdate {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        },
    )
}

fn apply_edge<S: MutableScene + ?Sized>(
    scene: &mut S,
    connector_id: ElementId,
    strategy: BindingStrategy,
    start: bool,
) -> ConnectorResult<()> {
    match strategy {
        BindingStrategy::Keep => Ok(()),
        BindingStrategy::Unbind => {
            if let Some(shape_id) = unbind_binding_element(scene, connector_id, start) {
                log::debug!("unbound connector {connector_id} from {shape_id}");
            }
            Ok(())
        }
        BindingStrategy::Bind {
            element_id,
            mode,
            focus_point,
        } => bind_binding_element(scene, connector_id, element_id, mode, start, focus_point),
    }
}

/// Write resolved strategies for both ends of a connector.
///
/// Elbow connectors are rerouted after any change. Simple connectors
/// move their bound ends when a strategy carries a focus point.
pub fn apply_binding_strategy<S: MutableScene + ?Sized>(
    scene: &mut S,
    connector_id: ElementId,
    strategies: BindingStrategies,
    route: RouteOptions,
) -> ConnectorResult<()> {
    if strategies == BindingStrategies::KEEP {
        return Ok(());
    }

    let updates = {
        let mut staged = StagedScene::new(&*scene);
        apply_edge(&mut staged, connector_id, strategies.start, true)?;
        apply_edge(&mut staged, connector_id, strategies.end, false)?;

        let connector = staged
            .connector(&connector_id)
            .cloned()
            .ok_or(ConnectorError::MissingElement(connector_id))?;
        let options = MovePointsOptions {
            move_mid_points_with_element: false,
            route,
        };

        if connector.elbowed {
            move_connector_points(&mut staged, connector_id, &BTreeMap::new(), options);
        } else if strategies.start.focus_point().is_some()
            || strategies.end.focus_point().is_some()
        {
            let points = bound_points(&connector, &staged);
            move_connector_points(&mut staged, connector_id, &points, options);
        }
        staged.into_updates()
    };

    commit(scene, updates);
    Ok(())
}

/// Recomputed local positions of every bound end.
fn bound_points<M: ElementsMap + ?Sized>(
    connector: &Connector,
    elements: &M,
) -> BTreeMap<usize, Point> {
    let mut points = BTreeMap::new();
    for start in [true, false] {
        let Some(binding) = connector.binding(start) else {
            continue;
        };
        let Some(shape) = elements.bindable(&binding.element_id) else {
            continue;
        };
        if let Some(p) = update_bound_point(connector, start, Some(binding), shape, elements) {
            points.insert(end_index(connector, start), p);
        }
    }
    points
}

/// Finish an endpoint drag: resolve and apply the final bindings.
///
/// `dragged` maps point indices to their new local positions; the caller
/// has already moved those points.
pub fn bind_or_unbind_binding_element<S: MutableScene + ?Sized>(
    scene: &mut S,
    connector_id: ElementId,
    dragged: &BTreeMap<usize, Point>,
    config: &BindingConfig,
    options: BindingOptions,
) -> ConnectorResult<BindingStrategies> {
    let connector = scene
        .connector(&connector_id)
        .cloned()
        .ok_or(ConnectorError::MissingElement(connector_id))?;
    let strategies = resolve_binding_strategy(
        &connector,
        dragged,
        &*scene,
        config,
        BindingOptions {
            finalize: true,
            ..options
        },
    )?;
    apply_binding_strategy(
        scene,
        connector_id,
        strategies,
        RouteOptions {
            is_dragging: false,
            zoom: config.zoom,
        },
    )?;
    Ok(strategies)
}

/// Pull every connector bound to `shape_id` along after the shape moved.
///
/// `new_size` is seen by the computation only; the shape itself is not
/// written. Returns the connectors that changed.
pub fn propagate_shape_move<S: MutableScene + ?Sized>(
    scene: &mut S,
    shape_id: ElementId,
    options: &PropagateOptions,
) -> Vec<ElementId> {
    let mut moved = Vec::new();
    let updates = {
        let mut staged = StagedScene::new(&*scene);
        let Some(shape) = staged.bindable(&shape_id).cloned() else {
            log::warn!("shape {shape_id} to propagate is missing");
            return moved;
        };
        if let Some((width, height)) = options.new_size {
            staged.mutate_element(
                &shape_id,
                &ElementUpdate {
                    width: Some(width),
                    height: Some(height),
                    ..Default::default()
                },
            );
        }
        let route = RouteOptions {
            is_dragging: false,
            zoom: options.zoom.unwrap_or(1.0),
        };

        let arrows = shape
            .bound_elements
            .iter()
            .filter(|b| b.kind == BoundElementKind::Arrow)
            .filter(|b| !options.simultaneously_updated.contains(&b.id));
        for arrow in arrows {
            let Some(connector) = staged.connector(&arrow.id).cloned() else {
                continue;
            };
            let start_id = connector.start_binding.map(|b| b.element_id);
            let end_id = connector.end_binding.map(|b| b.element_id);
            if start_id != Some(shape_id) && end_id != Some(shape_id) {
                continue;
            }

            let points = bound_points(&connector, &staged);
            let opts = MovePointsOptions {
                move_mid_points_with_element: start_id.is_some() && start_id == end_id,
                route,
            };
            if move_connector_points(&mut staged, arrow.id, &points, opts) {
                moved.push(arrow.id);
            }
            reposition_bound_label(&mut staged, arrow.id);
        }
        staged.into_updates()
    };

    commit(
        scene,
        updates.into_iter().filter(|(id, _)| *id != shape_id).collect(),
    );
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobalBindMode;
    use crate::elbow::validate_elbow_points;
    use crate::scene::Scene;
    use crate::shapes::{FixedSegment, SerializableColor, ShapeKind};
    use std::collections::HashSet;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn square(x: f64, y: f64) -> BindableShape {
        BindableShape::new(ShapeKind::Rectangle, x, y, 100.0, 100.0)
    }

    fn close(a: Point, b: Point, tol: f64) -> bool {
        a.distance(b) < tol
    }

    fn moved_to(scene: &mut Scene, id: ElementId, x: f64, y: f64) {
        scene.mutate_element(
            &id,
            &ElementUpdate {
                x: Some(x),
                y: Some(y),
                ..Default::default()
            },
        );
    }

    fn orbit(element_id: ElementId, fixed_point: [f64; 2]) -> Option<Binding> {
        Some(Binding {
            element_id,
            mode: BindingMode::Orbit,
            fixed_point,
        })
    }

    /// R1 and R2 side by side, a connector of `kind` between them, bound at
    /// both ends with back references in place.
    fn bound_pair(
        mut connector: Connector,
        fixed: [[f64; 2]; 2],
    ) -> (Scene, ElementId, ElementId, ElementId) {
        let mut scene = Scene::new();
        let mut r1 = square(0.0, 0.0);
        let mut r2 = square(300.0, 0.0);
        connector.start_binding = orbit(r1.id(), fixed[0]);
        connector.end_binding = orbit(r2.id(), fixed[1]);
        r1.bound_elements.push(BoundElementRef::arrow(connector.id()));
        r2.bound_elements.push(BoundElementRef::arrow(connector.id()));
        let (a, b) = (scene.add_element(r1), scene.add_element(r2));
        let c = scene.add_element(connector);
        (scene, a, b, c)
    }

    fn refs(scene: &Scene, id: &ElementId) -> Vec<ElementId> {
        scene.get(id).map(|e| e.bound_elements().iter().map(|b| b.id).collect()).unwrap_or_default()
    }

    #[test]
    fn test_bind_then_unbind_round_trip() {
        let mut scene = Scene::new();
        let shape = scene.add_element(square(0.0, 0.0));
        let c = scene.add_element(Connector::new(Point::new(-200.0, 50.0), Point::new(-6.0, 50.0)));

        bind_binding_element(&mut scene, c, shape, BindingMode::Orbit, false, None).unwrap();
        let binding = scene.connector(&c).unwrap().end_binding.unwrap();
        assert_eq!(binding.element_id, shape);
        assert_eq!(binding.mode, BindingMode::Orbit);
        assert!((binding.fixed_point[0] + 0.06).abs() < 1e-9);
        assert_eq!(refs(&scene, &shape), vec![c]);

        // Binding the same end again does not duplicate the back reference.
        bind_binding_element(&mut scene, c, shape, BindingMode::Orbit, false, None).unwrap();
        assert_eq!(refs(&scene, &shape), vec![c]);

        assert_eq!(unbind_binding_element(&mut scene, c, false), Some(shape));
        assert!(scene.connector(&c).unwrap().end_binding.is_none());
        assert!(refs(&scene, &shape).is_empty());
        assert_eq!(unbind_binding_element(&mut scene, c, false), None);
    }

    #[test]
    fn test_unbind_keeps_reference_while_other_end_is_bound() {
        let mut scene = Scene::new();
        let shape = scene.add_element(square(0.0, 0.0));
        let c = scene.add_element(Connector::new(Point::new(106.0, 20.0), Point::new(106.0, 80.0)));
        bind_binding_element(&mut scene, c, shape, BindingMode::Orbit, true, None).unwrap();
        bind_binding_element(&mut scene, c, shape, BindingMode::Orbit, false, None).unwrap();
        assert_eq!(refs(&scene, &shape), vec![c]);

        unbind_binding_element(&mut scene, c, true);
        assert_eq!(refs(&scene, &shape), vec![c]);
        unbind_binding_element(&mut scene, c, false);
        assert!(refs(&scene, &shape).is_empty());
    }

    #[test]
    fn test_rebinding_moves_back_reference() {
        let mut scene = Scene::new();
        let a = scene.add_element(square(0.0, 0.0));
        let b = scene.add_element(square(300.0, 0.0));
        let c = scene.add_element(Connector::new(Point::new(-100.0, 50.0), Point::new(-6.0, 50.0)));
        bind_binding_element(&mut scene, c, a, BindingMode::Orbit, false, None).unwrap();
        let focus = Some(Point::new(350.0, 50.0));
        bind_binding_element(&mut scene, c, b, BindingMode::Inside, false, focus).unwrap();
        assert!(refs(&scene, &a).is_empty());
        assert_eq!(refs(&scene, &b), vec![c]);
        assert_eq!(scene.connector(&c).unwrap().end_binding.unwrap().mode, BindingMode::Inside);
    }

    #[test]
    fn test_elbow_binding_always_orbits() {
        let mut scene = Scene::new();
        let shape = scene.add_element(square(0.0, 0.0));
        let c = Connector::new_elbow(Point::new(-200.0, 50.0), Point::new(-6.0, 50.0));
        let c = scene.add_element(c);
        let focus = Some(Point::new(50.0, 50.0));
        bind_binding_element(&mut scene, c, shape, BindingMode::Inside, false, focus).unwrap();
        assert_eq!(scene.connector(&c).unwrap().end_binding.unwrap().mode, BindingMode::Orbit);
    }

    #[test]
    fn test_bind_missing_shape_fails() {
        let mut scene = Scene::new();
        let c = scene.add_element(Connector::new(Point::new(0.0, 0.0), Point::new(50.0, 0.0)));
        let ghost = crate::shapes::new_element_id();
        assert_eq!(
            bind_binding_element(&mut scene, c, ghost, BindingMode::Orbit, true, None),
            Err(ConnectorError::MissingElement(ghost))
        );
        assert!(scene.connector(&c).unwrap().start_binding.is_none());
    }

    #[test]
    fn test_simple_arrow_follows_moved_shape() {
        let connector = Connector::new(Point::new(106.0, 50.0), Point::new(294.0, 50.0));
        let (mut scene, _, r2, c) = bound_pair(connector, [[1.06, 0.5], [-0.06, 0.5]]);

        moved_to(&mut scene, r2, 300.0, 100.0);
        let moved = propagate_shape_move(&mut scene, r2, &PropagateOptions::default());
        assert_eq!(moved, vec![c]);

        let arrow = scene.connector(&c).unwrap();
        assert!(close(arrow.endpoint(true), Point::new(106.0, 50.0), 0.1));
        assert!(close(arrow.endpoint(false), Point::new(294.0, 150.0), 0.1));
        assert_eq!(arrow.points[0], Point::ZERO);
    }

    #[test]
    fn test_new_size_is_not_written_to_the_shape() {
        let connector = Connector::new(Point::new(106.0, 50.0), Point::new(294.0, 50.0));
        let (mut scene, _, r2, c) = bound_pair(connector, [[1.06, 0.5], [-0.06, 0.5]]);
        let options = PropagateOptions {
            new_size: Some((100.0, 300.0)),
            ..Default::default()
        };
        propagate_shape_move(&mut scene, r2, &options);
        assert_eq!(scene.shape(&r2).unwrap().height, 100.0);
        // The end follows the fixed point on the resized shape.
        let end = scene.connector(&c).unwrap().endpoint(false);
        assert!(close(end, Point::new(294.0, 150.0), 0.1));
    }

    #[test]
    fn test_simultaneously_updated_connectors_are_skipped() {
        let connector = Connector::new(Point::new(106.0, 50.0), Point::new(294.0, 50.0));
        let (mut scene, _, r2, c) = bound_pair(connector, [[1.06, 0.5], [-0.06, 0.5]]);
        moved_to(&mut scene, r2, 300.0, 100.0);
        let options = PropagateOptions {
            simultaneously_updated: HashSet::from([c]),
            ..Default::default()
        };
        assert!(propagate_shape_move(&mut scene, r2, &options).is_empty());
        assert!(close(scene.connector(&c).unwrap().endpoint(false), Point::new(294.0, 50.0), 1e-9));
    }

    #[test]
    fn test_label_follows_path_midpoint() {
        let mut connector = Connector::new(Point::new(106.0, 50.0), Point::new(294.0, 50.0));
        let label = BindableShape::new(ShapeKind::Text, 0.0, 0.0, 40.0, 20.0);
        connector.bound_elements.push(BoundElementRef::text(label.id()));
        let (mut scene, _, r2, _) = bound_pair(connector, [[1.06, 0.5], [-0.06, 0.5]]);
        let label_id = scene.add_element(label);

        moved_to(&mut scene, r2, 300.0, 100.0);
        propagate_shape_move(&mut scene, r2, &PropagateOptions::default());

        let label = scene.shape(&label_id).unwrap();
        let center = label.center();
        assert!(close(center, Point::new(200.0, 100.0), 0.1));
    }

    #[test]
    fn test_elbow_fixed_segment_survives_shape_move() {
        init_logging();
        let connector = Connector::new_elbow(Point::new(106.0, 49.9), Point::new(294.0, 49.9));
        let (mut scene, _, r2, c) = bound_pair(connector, [[1.06, 0.499], [-0.06, 0.499]]);
        let options = MovePointsOptions::default();
        assert!(move_connector_points(&mut scene, c, &BTreeMap::new(), options));

        // Pin the only segment 20px lower.
        let arrow = scene.connector(&c).cloned().unwrap();
        let pinned = FixedSegment::new(1, Point::new(0.0, 20.0), Point::new(188.0, 20.0));
        let route = recompute_elbow_route(
            &arrow,
            &scene,
            &ElbowUpdates::with_fixed_segments(vec![pinned]),
            RouteOptions::default(),
        )
        .unwrap();
        scene.mutate_element(&c, &route.into());

        moved_to(&mut scene, r2, 300.0, -50.0);
        assert_eq!(propagate_shape_move(&mut scene, r2, &PropagateOptions::default()), vec![c]);

        let arrow = scene.connector(&c).unwrap();
        let points = arrow.global_points();
        assert!(validate_elbow_points(&points, 1.0));
        assert!(close(*points.last().unwrap(), Point::new(294.0, -0.1), 1e-6));
        let fixed = arrow.fixed_segments()[0];
        assert!(close(arrow.global_point(fixed.start), Point::new(146.0, 69.9), 1e-6));
        assert!(close(arrow.global_point(fixed.end), Point::new(254.0, 69.9), 1e-6));
    }

    #[test]
    fn test_inside_drop_moves_end_to_drop_point() {
        init_logging();
        let mut scene = Scene::new();
        let shape = scene.add_element(
            BindableShape::new(ShapeKind::Rectangle, 0.0, 0.0, 200.0, 200.0)
                .with_background(SerializableColor::white()),
        );
        let c = scene.add_element(Connector::new(Point::new(-300.0, 0.0), Point::new(-100.0, 0.0)));
        let drop = Point::new(120.0, 130.0);
        let dragged = BTreeMap::from([(1, scene.connector(&c).unwrap().local_point(drop))]);

        let strategies = bind_or_unbind_binding_element(
            &mut scene,
            c,
            &dragged,
            &BindingConfig::with_mode(GlobalBindMode::Inside),
            BindingOptions::default(),
        )
        .unwrap();
        assert_eq!(strategies.start, BindingStrategy::Keep);

        let arrow = scene.connector(&c).unwrap();
        let binding = arrow.end_binding.unwrap();
        assert_eq!(binding.element_id, shape);
        assert_eq!(binding.mode, BindingMode::Inside);
        assert!(close(arrow.endpoint(false), drop, 1e-9));
        assert!(close(arrow.endpoint(true), Point::new(-300.0, 0.0), 1e-9));
        assert_eq!(refs(&scene, &shape), vec![c]);
    }

    #[test]
    fn test_keep_strategies_write_nothing() {
        let mut scene = Scene::new();
        let c = scene.add_element(Connector::new(Point::new(0.0, 0.0), Point::new(50.0, 0.0)));
        let version = scene.connector(&c).unwrap().version;
        let options = RouteOptions::default();
        apply_binding_strategy(&mut scene, c, BindingStrategies::KEEP, options).unwrap();
        assert_eq!(scene.connector(&c).unwrap().version, version);
    }

    #[test]
    fn test_move_points_reanchors_at_first_point() {
        let mut scene = Scene::new();
        let c = scene.add_element(Connector::from_points(
            crate::shapes::ConnectorKind::Arrow,
            &[Point::new(0.0, 0.0), Point::new(50.0, 50.0), Point::new(100.0, 0.0)],
        ));
        let updates = BTreeMap::from([(0, Point::new(-10.0, 0.0))]);
        assert!(move_connector_points(&mut scene, c, &updates, MovePointsOptions::default()));
        let arrow = scene.connector(&c).unwrap();
        assert_eq!(arrow.points[0], Point::ZERO);
        let globals = arrow.global_points();
        assert!(close(globals[0], Point::new(-10.0, 0.0), 1e-9));
        assert!(close(globals[1], Point::new(50.0, 50.0), 1e-9));
        assert!(close(globals[2], Point::new(100.0, 0.0), 1e-9));
    }

    #[test]
    fn test_arrow_too_short_needs_both_outline_crossings() {
        let mut scene = Scene::new();
        let a = scene.add_element(square(0.0, 0.0));
        let b = scene.add_element(square(120.0, 0.0));
        let inside = |element_id, fixed_point| {
            Some(Binding {
                element_id,
                mode: BindingMode::Inside,
                fixed_point,
            })
        };

        // Both focus points inside: the 20px gap between the outlines counts.
        let mut c = Connector::new(Point::new(60.0, 50.0), Point::new(160.0, 50.0));
        c.start_binding = inside(a, [0.6, 0.5]);
        c.end_binding = inside(b, [0.4, 0.5]);
        assert!(arrow_too_short(&c, &scene));

        // The end orbits outside R2, so the line never crosses its outline.
        c.end_binding = orbit(b, [-0.06, 0.499]);
        assert!(!arrow_too_short(&c, &scene));

        // Neither end crosses an outline.
        c.start_binding = orbit(a, [1.06, 0.499]);
        assert!(!arrow_too_short(&c, &scene));
    }
}
