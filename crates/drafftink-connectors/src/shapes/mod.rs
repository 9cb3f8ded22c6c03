//! Element definitions for bindable shapes and connectors.

mod bindable;
mod connector;
mod freehand;

pub use bindable::{BindableShape, Roundness, ShapeKind};
pub use connector::{
    Arrowhead, Binding, BindingMode, Connector, ConnectorKind, FixedSegment,
};
pub use freehand::Freedraw;

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Whether the color lets everything below it show through.
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

/// What kind of element a back reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundElementKind {
    Arrow,
    Text,
}

/// Back reference from a shape to an element bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundElementRef {
    pub id: ElementId,
    pub kind: BoundElementKind,
}

impl BoundElementRef {
    pub fn arrow(id: ElementId) -> Self {
        Self {
            id,
            kind: BoundElementKind::Arrow,
        }
    }

    pub fn text(id: ElementId) -> Self {
        Self {
            id,
            kind: BoundElementKind::Text,
        }
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    if points.len() == 1 {
        return point.distance(points[0]);
    }
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Partial update for an element, committed through the scene's mutation hook.
///
/// Outer `None` leaves a field untouched; for nullable fields the inner
/// `Option` is the new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub points: Option<Vec<Point>>,
    pub start_binding: Option<Option<Binding>>,
    pub end_binding: Option<Option<Binding>>,
    pub fixed_segments: Option<Option<Vec<FixedSegment>>>,
    pub start_is_special: Option<Option<bool>>,
    pub end_is_special: Option<Option<bool>>,
    pub bound_elements: Option<Vec<BoundElementRef>>,
    pub container_id: Option<Option<ElementId>>,
    pub frame_id: Option<Option<ElementId>>,
    pub is_deleted: Option<bool>,
}

impl ElementUpdate {
    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` over `self`; fields set in `other` win.
    pub fn merge(&mut self, other: ElementUpdate) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        take!(
            x,
            y,
            width,
            height,
            points,
            start_binding,
            end_binding,
            fixed_segments,
            start_is_special,
            end_is_special,
            bound_elements,
            container_id,
            frame_id,
            is_deleted
        );
    }
}

/// Enum wrapper for every element the binding core knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    Shape(BindableShape),
    Connector(Connector),
    Freedraw(Freedraw),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Shape(s) => s.id,
            Element::Connector(c) => c.id,
            Element::Freedraw(f) => f.id,
        }
    }

    pub fn is_deleted(&self) -> bool {
        match self {
            Element::Shape(s) => s.is_deleted,
            Element::Connector(c) => c.is_deleted,
            Element::Freedraw(f) => f.is_deleted,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            Element::Shape(s) => s.version,
            Element::Connector(c) => c.version,
            Element::Freedraw(f) => f.version,
        }
    }

    /// Axis-aligned bounds in scene coordinates.
    pub fn bounds(&self) -> Rect {
        match self {
            Element::Shape(s) => crate::geometry::aabb_for_element(s, [0.0; 4]),
            Element::Connector(c) => c.bounds(),
            Element::Freedraw(f) => f.bounds(),
        }
    }

    pub fn as_shape(&self) -> Option<&BindableShape> {
        match self {
            Element::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match self {
            Element::Connector(c) => Some(c),
            _ => None,
        }
    }

    pub fn bound_elements(&self) -> &[BoundElementRef] {
        match self {
            Element::Shape(s) => &s.bound_elements,
            Element::Connector(c) => &c.bound_elements,
            Element::Freedraw(_) => &[],
        }
    }

    pub fn frame_id(&self) -> Option<ElementId> {
        match self {
            Element::Shape(s) => s.frame_id,
            Element::Connector(c) => c.frame_id,
            Element::Freedraw(f) => f.frame_id,
        }
    }

    /// Apply a partial update. Fields that do not exist on the variant are ignored.
    pub fn apply_update(&mut self, update: &ElementUpdate) {
        match self {
            Element::Shape(s) => s.apply_update(update),
            Element::Connector(c) => c.apply_update(update),
            Element::Freedraw(f) => {
                if let Some(x) = update.x {
                    f.x = x;
                }
                if let Some(y) = update.y {
                    f.y = y;
                }
                if let Some(points) = &update.points {
                    f.points = points.clone();
                }
                if let Some(frame_id) = update.frame_id {
                    f.frame_id = frame_id;
                }
                if let Some(deleted) = update.is_deleted {
                    f.is_deleted = deleted;
                }
            }
        }
    }

    pub(crate) fn bump_version(&mut self) {
        match self {
            Element::Shape(s) => s.version = s.version.wrapping_add(1),
            Element::Connector(c) => c.version = c.version.wrapping_add(1),
            Element::Freedraw(f) => f.version = f.version.wrapping_add(1),
        }
    }
}

impl From<BindableShape> for Element {
    fn from(shape: BindableShape) -> Self {
        Element::Shape(shape)
    }
}

impl From<Connector> for Element {
    fn from(connector: Connector) -> Self {
        Element::Connector(connector)
    }
}

impl From<Freedraw> for Element {
    fn from(freedraw: Freedraw) -> Self {
        Element::Freedraw(freedraw)
    }
}

/// Create a fresh element id.
pub fn new_element_id() -> ElementId {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_to_segment_dist() {
        let d = point_to_segment_dist(Point::new(5.0, 5.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-9);
        let d = point_to_segment_dist(Point::new(-3.0, 4.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_merge_prefers_later_fields() {
        let mut a = ElementUpdate {
            x: Some(1.0),
            start_binding: Some(None),
            ..Default::default()
        };
        a.merge(ElementUpdate {
            x: Some(2.0),
            y: Some(3.0),
            ..Default::default()
        });
        assert_eq!(a.x, Some(2.0));
        assert_eq!(a.y, Some(3.0));
        assert_eq!(a.start_binding, Some(None));
        assert!(!a.is_empty());
        assert!(ElementUpdate::default().is_empty());
    }

    #[test]
    fn test_apply_update_bumps_nothing_by_itself() {
        let mut el = Element::from(BindableShape::new(ShapeKind::Rectangle, 0.0, 0.0, 10.0, 10.0));
        let v = el.version();
        el.apply_update(&ElementUpdate {
            x: Some(5.0),
            ..Default::default()
        });
        assert_eq!(el.version(), v);
        assert!((el.bounds().x0 - 5.0).abs() < 1e-9);
        el.bump_version();
        assert_eq!(el.version(), v + 1);
    }
}
