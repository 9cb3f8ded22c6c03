//! Deciding what an endpoint drag does to a connector's bindings.

use super::snap::{snap_to_center, snap_to_mid};
use crate::collision::{all_hovered_elements_at_point, hovered_element_for_binding};
use crate::config::{BindingConfig, BindingOptions, GlobalBindMode};
use crate::error::{ConnectorError, ConnectorResult, invariant};
use crate::geometry::is_bindable_inside_other_bindable;
use crate::scene::ElementsMap;
use crate::shapes::{BindableShape, BindingMode, Connector, ElementId};
use kurbo::Point;
use std::collections::BTreeMap;

/// What to do with one end's binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingStrategy {
    /// Leave the binding as it is.
    Keep,
    /// Break the binding.
    Unbind,
    /// Bind to a shape, anchored at `focus_point` when one is dictated.
    Bind {
        element_id: ElementId,
        mode: BindingMode,
        focus_point: Option<Point>,
    },
}

impl BindingStrategy {
    fn bind(shape: &BindableShape, mode: BindingMode, focus_point: Point) -> Self {
        BindingStrategy::Bind {
            element_id: shape.id(),
            mode,
            focus_point: Some(focus_point),
        }
    }

    fn inside(shape: &BindableShape, point: Point) -> Self {
        Self::bind(shape, BindingMode::Inside, point)
    }

    /// Orbit binding with the anchor pulled to the center or a side midpoint.
    fn orbit(shape: &BindableShape, point: Point) -> Self {
        let centered = snap_to_center(shape, point);
        let focus = if centered != point {
            centered
        } else {
            snap_to_mid(shape, point)
        };
        Self::bind(shape, BindingMode::Orbit, focus)
    }

    fn bind_or_unbind(hit: Option<&BindableShape>, mode: BindingMode, point: Point) -> Self {
        match hit {
            Some(shape) => Self::bind(shape, mode, point),
            None => BindingStrategy::Unbind,
        }
    }

    pub fn focus_point(&self) -> Option<Point> {
        match self {
            BindingStrategy::Bind { focus_point, .. } => *focus_point,
            _ => None,
        }
    }
}

/// Strategies for both ends of a connector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingStrategies {
    pub start: BindingStrategy,
    pub end: BindingStrategy,
}

impl BindingStrategies {
    pub const KEEP: Self = Self {
        start: BindingStrategy::Keep,
        end: BindingStrategy::Keep,
    };

    /// Place the dragged end's strategy on the right side.
    fn for_dragged(start_dragged: bool, current: BindingStrategy, other: BindingStrategy) -> Self {
        if start_dragged {
            Self {
                start: current,
                end: other,
            }
        } else {
            Self {
                start: other,
                end: current,
            }
        }
    }
}

/// Decide how the bindings of `connector` change while the points in
/// `dragged` (index to new local position) are being dragged.
///
/// Pure: nothing is written. Feed the result to
/// [`apply_binding_strategy`](super::apply_binding_strategy).
pub fn resolve_binding_strategy<M: ElementsMap + ?Sized>(
    connector: &Connector,
    dragged: &BTreeMap<usize, Point>,
    elements: &M,
    config: &BindingConfig,
    options: BindingOptions,
) -> ConnectorResult<BindingStrategies> {
    let count = connector.points.len();
    invariant(count > 1, ConnectorError::SinglePointConnector)?;

    let end_idx = count - 1;
    let start_dragged = dragged.contains_key(&0);
    let end_dragged = dragged.contains_key(&end_idx);

    if !start_dragged && !end_dragged {
        return Ok(BindingStrategies::KEEP);
    }

    if start_dragged && end_dragged {
        return Ok(BindingStrategies {
            start: BindingStrategy::Unbind,
            end: BindingStrategy::Unbind,
        });
    }

    if config.bind_mode == GlobalBindMode::Off {
        return Ok(BindingStrategies::for_dragged(
            start_dragged,
            BindingStrategy::Unbind,
            BindingStrategy::Keep,
        ));
    }

    let max_distance = config.max_binding_distance();

    if connector.elbowed {
        return elbow_endpoint_strategy(connector, dragged, elements, max_distance);
    }

    let idx = if start_dragged { 0 } else { end_idx };
    let Some(local) = dragged.get(&idx) else {
        return Ok(BindingStrategies::KEEP);
    };
    let point = connector.global_point(*local);

    if options.new_arrow {
        let strategies =
            new_connector_strategy(connector, start_dragged, point, elements, config, max_distance);
        log::debug!("new connector strategy: {strategies:?}");
        return Ok(strategies);
    }

    if options.alt_key {
        let hit = hovered_element_for_binding(point, elements, max_distance);
        return Ok(BindingStrategies::for_dragged(
            start_dragged,
            BindingStrategy::bind_or_unbind(hit, BindingMode::Inside, point),
            BindingStrategy::Keep,
        ));
    }

    let (current, other) = existing_connector_strategy(
        connector,
        start_dragged,
        point,
        elements,
        config.bind_mode,
        options.finalize,
        max_distance,
    );
    Ok(BindingStrategies::for_dragged(start_dragged, current, other))
}

/// Elbow connectors move one end at a time and always orbit.
fn elbow_endpoint_strategy<M: ElementsMap + ?Sized>(
    connector: &Connector,
    dragged: &BTreeMap<usize, Point>,
    elements: &M,
    max_distance: f64,
) -> ConnectorResult<BindingStrategies> {
    invariant(dragged.len() == 1, ConnectorError::BothElbowEndpointsDragged)?;

    let Some((&idx, &local)) = dragged.iter().next() else {
        return Ok(BindingStrategies::KEEP);
    };
    let point = connector.global_point(local);

    let current = match hovered_element_for_binding(point, elements, max_distance) {
        Some(hit) => BindingStrategy::Bind {
            element_id: hit.id(),
            mode: BindingMode::Orbit,
            focus_point: connector.points.get(idx).map(|p| connector.global_point(*p)),
        },
        None => BindingStrategy::Unbind,
    };

    Ok(BindingStrategies::for_dragged(idx == 0, current, BindingStrategy::Keep))
}

/// Binding while a connector is being drawn.
///
/// The start binds inside wherever it lands. The end may pull the start
/// binding along: onto the same shape both ends go inside, and when the
/// start shape encloses the hovered one the start switches to orbit.
fn new_connector_strategy<M: ElementsMap + ?Sized>(
    connector: &Connector,
    start_dragged: bool,
    point: Point,
    elements: &M,
    config: &BindingConfig,
    max_distance: f64,
) -> BindingStrategies {
    let multi_point = connector.points.len() > 2;
    let hit = hovered_element_for_binding(point, elements, max_distance);

    if start_dragged {
        return BindingStrategies {
            start: BindingStrategy::bind_or_unbind(hit, BindingMode::Inside, point),
            end: BindingStrategy::Keep,
        };
    }

    let inside_mode = if config.bind_mode.forces_inside() {
        BindingMode::Inside
    } else {
        BindingMode::Orbit
    };
    let origin = config.drag_origin.unwrap_or_else(|| connector.endpoint(true));

    // A start binding to a shape that is gone counts as none.
    let start_shape = connector
        .start_binding
        .and_then(|b| elements.bindable(&b.element_id));

    let Some(start_shape) = start_shape else {
        return BindingStrategies {
            start: BindingStrategy::Keep,
            end: BindingStrategy::bind_or_unbind(hit, inside_mode, point),
        };
    };

    if let Some(hit) = hit {
        if hit.id() == start_shape.id() {
            return BindingStrategies {
                start: if multi_point {
                    BindingStrategy::Keep
                } else {
                    BindingStrategy::inside(hit, config.drag_origin.unwrap_or_else(|| hit.center()))
                },
                end: if multi_point {
                    BindingStrategy::bind(hit, BindingMode::Orbit, point)
                } else {
                    BindingStrategy::inside(hit, point)
                },
            };
        }

        // The end hovers a shape inside the start's shape.
        let start_also_hovered = all_hovered_elements_at_point(point, elements, max_distance)
            .iter()
            .any(|s| s.id() == start_shape.id());
        if start_also_hovered {
            return BindingStrategies {
                start: if multi_point {
                    BindingStrategy::Keep
                } else {
                    BindingStrategy::bind(start_shape, BindingMode::Orbit, origin)
                },
                end: BindingStrategy::bind(hit, BindingMode::Orbit, point),
            };
        }
    }

    let start_mode = if config.start_is_inside {
        BindingMode::Inside
    } else {
        BindingMode::Orbit
    };
    let current = match hit {
        Some(hit) => {
            let nested = is_bindable_inside_other_bindable(start_shape, hit);
            let mode = if config.bind_mode.forces_inside() && !nested {
                BindingMode::Inside
            } else {
                BindingMode::Orbit
            };
            BindingStrategy::bind(hit, mode, point)
        }
        None => BindingStrategy::Unbind,
    };

    BindingStrategies {
        start: if multi_point {
            BindingStrategy::Keep
        } else {
            BindingStrategy::bind(start_shape, start_mode, origin)
        },
        end: current,
    }
}

/// One end of an existing connector is dragged.
///
/// Returns the strategies for the dragged end and the opposite end.
fn existing_connector_strategy<M: ElementsMap + ?Sized>(
    connector: &Connector,
    start_dragged: bool,
    point: Point,
    elements: &M,
    bind_mode: GlobalBindMode,
    finalize: bool,
    max_distance: f64,
) -> (BindingStrategy, BindingStrategy) {
    let current_binding = connector.binding(start_dragged);
    let opposite_binding = connector.binding(!start_dragged);
    let multi_point = connector.points.len() > 2;

    let hit = hovered_element_for_binding(point, elements, max_distance);
    let opposite = opposite_binding.and_then(|b| elements.bindable(&b.element_id));
    let overlapping = opposite.is_some_and(|o| {
        all_hovered_elements_at_point(point, elements, max_distance)
            .iter()
            .any(|s| s.id() == o.id())
    });
    let opposite_transparent =
        overlapping && opposite.is_some_and(|o| o.background.is_transparent());

    // Free binding: bind exactly where the pointer is.
    if bind_mode.forces_inside() {
        let current = match hit {
            Some(hit) => match opposite {
                Some(o) if overlapping && !opposite_transparent => {
                    BindingStrategy::inside(o, point)
                }
                _ => BindingStrategy::inside(hit, point),
            },
            None => BindingStrategy::Unbind,
        };
        let landed_on_opposite =
            hit.is_some_and(|h| opposite_binding.is_some_and(|b| b.element_id == h.id()));
        let other = if finalize && landed_on_opposite {
            BindingStrategy::Unbind
        } else {
            BindingStrategy::Keep
        };
        return (current, other);
    }

    let Some(hit) = hit else {
        return (BindingStrategy::Unbind, BindingStrategy::Keep);
    };

    if current_binding.is_some_and(|b| b.element_id == hit.id() && b.mode == BindingMode::Inside) {
        return (BindingStrategy::inside(hit, point), BindingStrategy::Keep);
    }

    let current = match opposite_binding {
        Some(ob) if ob.element_id == hit.id() => {
            if ob.mode == BindingMode::Inside {
                return (BindingStrategy::inside(hit, point), BindingStrategy::Keep);
            }
            let other = if finalize && !multi_point {
                BindingStrategy::Unbind
            } else {
                BindingStrategy::Keep
            };
            return (BindingStrategy::orbit(hit, point), other);
        }
        Some(_) => match opposite {
            Some(o) if overlapping && !opposite_transparent => BindingStrategy::inside(o, point),
            _ => BindingStrategy::orbit(hit, point),
        },
        None => BindingStrategy::orbit(hit, point),
    };

    (current, BindingStrategy::Keep)
}
