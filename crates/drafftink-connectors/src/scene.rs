//! Element maps and the mutation hook.
//!
//! Binding and routing read elements through [`ElementsMap`] and write only
//! through [`MutableScene::mutate_element`]. [`StagedScene`] layers pending
//! updates over an untouched snapshot so a whole operation can be computed
//! first and committed in one pass.

use crate::shapes::{BindableShape, Connector, Element, ElementId, ElementUpdate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read access to the elements of a scene.
pub trait ElementsMap {
    /// Look up any element, deleted ones included.
    fn get(&self, id: &ElementId) -> Option<&Element>;

    /// All elements, back to front.
    fn ordered(&self) -> Box<dyn Iterator<Item = &Element> + '_>;

    /// A live (non-deleted) bindable shape.
    fn bindable(&self, id: &ElementId) -> Option<&BindableShape> {
        match self.get(id)? {
            Element::Shape(s) if !s.is_deleted => Some(s),
            _ => None,
        }
    }

    /// A live connector.
    fn connector(&self, id: &ElementId) -> Option<&Connector> {
        match self.get(id)? {
            Element::Connector(c) if !c.is_deleted => Some(c),
            _ => None,
        }
    }

    /// Live bindable shapes, front to back.
    fn bindables_front_to_back(&self) -> Vec<&BindableShape> {
        let mut shapes: Vec<&BindableShape> = self
            .ordered()
            .filter_map(|e| match e {
                Element::Shape(s) if !s.is_deleted => Some(s),
                _ => None,
            })
            .collect();
        shapes.reverse();
        shapes
    }
}

/// Write access: the single commit point for every change.
pub trait MutableScene: ElementsMap {
    /// Apply `update` to the element. Returns false when the element is unknown.
    fn mutate_element(&mut self, id: &ElementId, update: &ElementUpdate) -> bool;
}

/// In-memory scene: elements keyed by id plus their stacking order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    /// All elements, keyed by ID.
    pub elements: HashMap<ElementId, Element>,
    /// Z-order of elements (back to front).
    pub z_order: Vec<ElementId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element on top of the stack.
    pub fn add_element(&mut self, element: impl Into<Element>) -> ElementId {
        let element = element.into();
        let id = element.id();
        if !self.elements.contains_key(&id) {
            self.z_order.push(id);
        }
        self.elements.insert(id, element);
        id
    }

    /// Remove an element outright (no tombstone).
    pub fn remove_element(&mut self, id: ElementId) -> Option<Element> {
        self.z_order.retain(|&element_id| element_id != id);
        self.elements.remove(&id)
    }

    /// Bring an element to the front (top of z-order).
    pub fn bring_to_front(&mut self, id: ElementId) {
        if self.elements.contains_key(&id) {
            self.z_order.retain(|&element_id| element_id != id);
            self.z_order.push(id);
        }
    }

    /// Send an element to the back (bottom of z-order).
    pub fn send_to_back(&mut self, id: ElementId) {
        if self.elements.contains_key(&id) {
            self.z_order.retain(|&element_id| element_id != id);
            self.z_order.insert(0, id);
        }
    }

    pub fn shape(&self, id: &ElementId) -> Option<&BindableShape> {
        self.get(id).and_then(Element::as_shape)
    }

    pub fn connector_any(&self, id: &ElementId) -> Option<&Connector> {
        self.get(id).and_then(Element::as_connector)
    }

    /// Commit a batch of updates in order.
    pub fn commit(&mut self, updates: Vec<(ElementId, ElementUpdate)>) {
        commit(self, updates);
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Serialize the scene to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a scene from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ElementsMap for Scene {
    fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    fn ordered(&self) -> Box<dyn Iterator<Item = &Element> + '_> {
        Box::new(self.z_order.iter().filter_map(|id| self.elements.get(id)))
    }
}

impl MutableScene for Scene {
    fn mutate_element(&mut self, id: &ElementId, update: &ElementUpdate) -> bool {
        let Some(element) = self.elements.get_mut(id) else {
            log::warn!("mutation of unknown element {id}");
            return false;
        };
        if update.is_empty() {
            return true;
        }
        element.apply_update(update);
        element.bump_version();
        true
    }
}

/// Pending updates layered over a read-only snapshot.
pub struct StagedScene<'a, M: ElementsMap + ?Sized> {
    base: &'a M,
    staged: HashMap<ElementId, Element>,
    updates: Vec<(ElementId, ElementUpdate)>,
}

impl<'a, M: ElementsMap + ?Sized> StagedScene<'a, M> {
    pub fn new(base: &'a M) -> Self {
        Self {
            base,
            staged: HashMap::new(),
            updates: Vec::new(),
        }
    }

    /// Whether anything was staged.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// The batch to hand to [`commit`], one merged update per element in
    /// first-touched order.
    pub fn into_updates(self) -> Vec<(ElementId, ElementUpdate)> {
        let mut merged: Vec<(ElementId, ElementUpdate)> = Vec::new();
        for (id, update) in self.updates {
            match merged.iter_mut().find(|(m, _)| *m == id) {
                Some((_, existing)) => existing.merge(update),
                None => merged.push((id, update)),
            }
        }
        merged
    }
}

impl<M: ElementsMap + ?Sized> ElementsMap for StagedScene<'_, M> {
    fn get(&self, id: &ElementId) -> Option<&Element> {
        self.staged.get(id).or_else(|| self.base.get(id))
    }

    fn ordered(&self) -> Box<dyn Iterator<Item = &Element> + '_> {
        Box::new(
            self.base
                .ordered()
                .map(move |e| self.staged.get(&e.id()).unwrap_or(e)),
        )
    }
}

impl<M: ElementsMap + ?Sized> MutableScene for StagedScene<'_, M> {
    fn mutate_element(&mut self, id: &ElementId, update: &ElementUpdate) -> bool {
        let Some(mut element) = self.get(id).cloned() else {
            log::warn!("staged mutation of unknown element {id}");
            return false;
        };
        if update.is_empty() {
            return true;
        }
        element.apply_update(update);
        self.staged.insert(*id, element);
        self.updates.push((*id, update.clone()));
        true
    }
}

/// Write a batch of staged updates through the mutation hook.
pub fn commit<S: MutableScene + ?Sized>(scene: &mut S, updates: Vec<(ElementId, ElementUpdate)>) {
    for (id, update) in updates {
        scene.mutate_element(&id, &update);
    }
}

/// Compute against a staged view of `scene`, then commit the result.
///
/// Nothing is written when `compute` returns `None`.
pub fn with_staged<S, T>(
    scene: &mut S,
    compute: impl FnOnce(&mut StagedScene<'_, S>) -> Option<T>,
) -> Option<T>
where
    S: MutableScene,
{
    let (result, updates) = {
        let mut staged = StagedScene::new(&*scene);
        let result = compute(&mut staged);
        (result, staged.into_updates())
    };
    if result.is_some() {
        commit(scene, updates);
    }
    result
}
