//! Keeping references between bound and bindable elements consistent.
//!
//! A bound element points at its targets through `frame_id`,
//! `container_id`, `start_binding` and `end_binding`; a bindable element
//! lists what points at it in `bound_elements`. The helpers here repair one
//! side after the other changed (deletion, duplication, undo/redo replay).
//!
//! Every update is written immediately through [`MutableScene`], and later
//! reads see it, so the order in which elements are visited is the order
//! in which conflicts are resolved.

use crate::config::RouteOptions;
use crate::elbow::{ElbowUpdates, recompute_elbow_route};
use crate::scene::MutableScene;
use crate::shapes::{
    BoundElementKind, BoundElementRef, Element, ElementId, ElementUpdate, ShapeKind,
};
use std::collections::{HashMap, HashSet};

/// A field through which a bound element references a bindable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingProp {
    FrameId,
    ContainerId,
    StartBinding,
    EndBinding,
}

impl BindingProp {
    /// Update clearing this field.
    pub fn cleared(self) -> ElementUpdate {
        let mut update = ElementUpdate::default();
        match self {
            BindingProp::FrameId => update.frame_id = Some(None),
            BindingProp::ContainerId => update.container_id = Some(None),
            BindingProp::StartBinding => update.start_binding = Some(None),
            BindingProp::EndBinding => update.end_binding = Some(None),
        }
        update
    }
}

/// Every element `element` references, with the field it uses.
pub fn binding_targets(element: &Element) -> Vec<(BindingProp, ElementId)> {
    let mut targets = Vec::new();
    if let Some(frame_id) = element.frame_id() {
        targets.push((BindingProp::FrameId, frame_id));
    }
    match element {
        Element::Shape(shape) => {
            if let Some(container_id) = shape.container_id {
                targets.push((BindingProp::ContainerId, container_id));
            }
        }
        Element::Connector(connector) => {
            if let Some(b) = &connector.start_binding {
                targets.push((BindingProp::StartBinding, b.element_id));
            }
            if let Some(b) = &connector.end_binding {
                targets.push((BindingProp::EndBinding, b.element_id));
            }
        }
        Element::Freedraw(_) => {}
    }
    targets
}

/// Kind under which `element` is listed in `bound_elements`, if it can be.
fn bound_kind(element: &Element) -> Option<BoundElementKind> {
    match element {
        Element::Connector(c) if c.is_arrow() => Some(BoundElementKind::Arrow),
        Element::Shape(s) if s.kind == ShapeKind::Text => Some(BoundElementKind::Text),
        _ => None,
    }
}

/// `bound_elements` without `remove`, with `add` appended.
fn new_bound_elements(
    current: &[BoundElementRef],
    remove: &HashSet<ElementId>,
    add: &[BoundElementRef],
) -> Vec<BoundElementRef> {
    current
        .iter()
        .filter(|b| !remove.contains(&b.id))
        .chain(add.iter())
        .copied()
        .collect()
}

fn set_bound_elements<S: MutableScene + ?Sized>(
    scene: &mut S,
    id: &ElementId,
    remove: &[ElementId],
    add: &[BoundElementRef],
) {
    let Some(current) = scene.get(id).map(|e| e.bound_elements().to_vec()) else {
        return;
    };
    let remove: HashSet<ElementId> = remove.iter().copied().collect();
    let next = new_bound_elements(&current, &remove, add);
    scene.mutate_element(
        id,
        &ElementUpdate {
            bound_elements: Some(next),
            ..Default::default()
        },
    );
}

fn live<'a, S: MutableScene + ?Sized>(scene: &'a S, id: &ElementId) -> Option<&'a Element> {
    scene.get(id).filter(|e| !e.is_deleted())
}

/// The referencing side: connectors, labels and framed elements.
pub struct BoundElement;

impl BoundElement {
    /// Remove `bound` from the `bound_elements` of every live element it
    /// references.
    pub fn unbind_affected<S: MutableScene + ?Sized>(scene: &mut S, bound: &Element) {
        let bound_id = bound.id();
        for (_, target_id) in binding_targets(bound) {
            let Some(target) = live(scene, &target_id) else {
                continue;
            };
            if target.bound_elements().iter().any(|b| b.id == bound_id) {
                set_bound_elements(scene, &target_id, &[bound_id], &[]);
            }
        }
    }

    /// Re-add `bound` to the elements it references.
    ///
    /// References to missing or deleted targets are cleared. A label is
    /// only re-added when its container has no other label; otherwise the
    /// label lets go of the container.
    pub fn rebind_affected<S: MutableScene + ?Sized>(scene: &mut S, bound: &Element) {
        if bound.is_deleted() {
            return;
        }
        let bound_id = bound.id();

        for (prop, target_id) in binding_targets(bound) {
            let Some(target) = live(scene, &target_id) else {
                scene.mutate_element(&bound_id, &prop.cleared());
                continue;
            };

            // Frame membership is one-way.
            if prop == BindingProp::FrameId {
                continue;
            }

            if target.bound_elements().iter().any(|b| b.id == bound_id) {
                continue;
            }

            match bound_kind(bound) {
                Some(BoundElementKind::Arrow) => {
                    set_bound_elements(scene, &target_id, &[], &[BoundElementRef::arrow(bound_id)]);
                }
                Some(BoundElementKind::Text) => {
                    let has_label = target
                        .bound_elements()
                        .iter()
                        .any(|b| b.kind == BoundElementKind::Text);
                    if has_label {
                        scene.mutate_element(&bound_id, &prop.cleared());
                    } else {
                        let label = BoundElementRef::text(bound_id);
                        set_bound_elements(scene, &target_id, &[], &[label]);
                    }
                }
                None => {}
            }
        }
    }
}

/// The referenced side: anything with a `bound_elements` list.
pub struct BindableElement;

impl BindableElement {
    /// Clear every reference live bound elements hold to `bindable`.
    pub fn unbind_affected<S: MutableScene + ?Sized>(scene: &mut S, bindable: &Element) {
        let bindable_id = bindable.id();
        for entry in bindable.bound_elements() {
            let Some(bound) = live(scene, &entry.id) else {
                continue;
            };
            let props: Vec<BindingProp> = binding_targets(bound)
                .into_iter()
                .filter(|(_, target)| *target == bindable_id)
                .map(|(prop, _)| prop)
                .collect();
            for prop in props {
                scene.mutate_element(&entry.id, &prop.cleared());
            }
        }
    }

    /// Restore labels pointing back at `bindable`.
    ///
    /// Entries for missing or deleted elements are dropped. Of several
    /// labels only the most recently added one is kept.
    pub fn rebind_affected<S: MutableScene + ?Sized>(scene: &mut S, bindable: &Element) {
        if bindable.is_deleted() {
            return;
        }
        let bindable_id = bindable.id();

        for entry in bindable.bound_elements().to_vec() {
            let Some(bound) = live(scene, &entry.id) else {
                set_bound_elements(scene, &bindable_id, &[entry.id], &[]);
                continue;
            };
            let Element::Shape(label) = bound else {
                continue;
            };
            if label.kind != ShapeKind::Text {
                continue;
            }
            let container_id = label.container_id;

            let latest_label = scene.get(&bindable_id).and_then(|e| {
                e.bound_elements()
                    .iter()
                    .rev()
                    .find(|b| b.kind == BoundElementKind::Text)
                    .map(|b| b.id)
            });

            if latest_label == Some(entry.id) {
                if container_id != Some(bindable_id) {
                    scene.mutate_element(
                        &entry.id,
                        &ElementUpdate {
                            container_id: Some(Some(bindable_id)),
                            ..Default::default()
                        },
                    );
                }
            } else {
                if container_id.is_some() {
                    scene.mutate_element(&entry.id, &BindingProp::ContainerId.cleared());
                }
                set_bound_elements(scene, &bindable_id, &[entry.id], &[]);
            }
        }
    }
}

/// Strip references to and from elements that were just deleted.
pub fn fix_bindings_after_deletion<S: MutableScene + ?Sized>(scene: &mut S, deleted: &[ElementId]) {
    for id in deleted {
        let Some(element) = scene.get(id).cloned() else {
            continue;
        };
        BoundElement::unbind_affected(scene, &element);
        BindableElement::unbind_affected(scene, &element);
    }
}

/// Point duplicated elements at each other instead of at the originals.
///
/// `id_map` maps original ids to duplicate ids; `duplicates` are the new
/// elements, already in the scene. References to elements that were not
/// duplicated are dropped, and duplicated elbow connectors are re-routed
/// against their new targets.
pub fn fix_bindings_after_duplication<S: MutableScene + ?Sized>(
    scene: &mut S,
    duplicates: &[ElementId],
    id_map: &HashMap<ElementId, ElementId>,
) {
    for id in duplicates {
        let Some(element) = scene.get(id).cloned() else {
            continue;
        };

        let mut update = ElementUpdate::default();
        let bound = element.bound_elements();
        if !bound.is_empty() {
            update.bound_elements = Some(
                bound
                    .iter()
                    .filter_map(|b| {
                        let id = *id_map.get(&b.id)?;
                        Some(BoundElementRef { id, kind: b.kind })
                    })
                    .collect(),
            );
        }

        match &element {
            Element::Shape(shape) => {
                if let Some(container_id) = shape.container_id {
                    update.container_id = Some(id_map.get(&container_id).copied());
                }
            }
            Element::Connector(connector) => {
                let remap = |binding: &Option<crate::shapes::Binding>| {
                    binding.map(|b| {
                        id_map.get(&b.element_id).map(|new_id| crate::shapes::Binding {
                            element_id: *new_id,
                            ..b
                        })
                    })
                };
                if let Some(start) = remap(&connector.start_binding) {
                    update.start_binding = Some(start);
                }
                if let Some(end) = remap(&connector.end_binding) {
                    update.end_binding = Some(end);
                }
            }
            Element::Freedraw(_) => {}
        }

        scene.mutate_element(id, &update);

        let Some(connector) = scene.connector(id).filter(|c| c.elbowed).cloned() else {
            continue;
        };
        let (Some(first), Some(last)) = (connector.points.first(), connector.points.last()) else {
            continue;
        };
        let updates = ElbowUpdates::with_points(vec![*first, *last]);
        let route = recompute_elbow_route(&connector, &*scene, &updates, RouteOptions::default());
        if let Some(route) = route {
            scene.mutate_element(id, &route.into());
        }
    }
}
