//! Bindable shapes: the targets connectors attach to.

use super::{BoundElementKind, BoundElementRef, ElementId, ElementUpdate, SerializableColor};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminant of a bindable shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Diamond,
    Ellipse,
    Text,
    Frame,
    Image,
    Embeddable,
}

impl ShapeKind {
    /// Shapes whose outline is a (possibly rounded) rectangle.
    pub fn is_rectanguloid(self) -> bool {
        !matches!(self, ShapeKind::Diamond | ShapeKind::Ellipse)
    }

    /// Shapes that are hit on their whole body regardless of fill.
    pub fn is_always_solid(self) -> bool {
        matches!(
            self,
            ShapeKind::Text | ShapeKind::Image | ShapeKind::Embeddable
        )
    }
}

/// Corner rounding mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Roundness {
    /// Radius is a fixed share of the shorter side.
    Proportional,
    /// Fixed radius in pixels (default when `None`), unless the side is too small for it.
    Adaptive(Option<f64>),
}

impl Roundness {
    /// Default adaptive corner radius in pixels.
    /// This fixed radius keeps visual appearance consistent across different element sizes.
    pub const DEFAULT_ADAPTIVE_RADIUS: f64 = 32.0;

    /// Default proportional radius (25% of the side).
    /// Used for legacy elements and diamonds.
    pub const DEFAULT_PROPORTIONAL_RADIUS: f64 = 0.25;

    /// Corner radius for a side of length `side`.
    pub fn corner_radius(self, side: f64) -> f64 {
        match self {
            Roundness::Proportional => side * Self::DEFAULT_PROPORTIONAL_RADIUS,
            Roundness::Adaptive(value) => {
                let fixed = value.unwrap_or(Self::DEFAULT_ADAPTIVE_RADIUS);
                let cutoff = fixed / Self::DEFAULT_PROPORTIONAL_RADIUS;
                if side <= cutoff {
                    side * Self::DEFAULT_PROPORTIONAL_RADIUS
                } else {
                    fixed
                }
            }
        }
    }
}

/// A shape connectors can bind to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindableShape {
    pub(crate) id: ElementId,
    pub kind: ShapeKind,
    /// Left edge of the unrotated box.
    pub x: f64,
    /// Top edge of the unrotated box.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub angle: f64,
    pub stroke_width: f64,
    /// Background fill; transparent shapes are only hit on their outline.
    pub background: SerializableColor,
    #[serde(default)]
    pub roundness: Option<Roundness>,
    /// Connectors and labels bound to this shape.
    #[serde(default)]
    pub bound_elements: Vec<BoundElementRef>,
    /// For text: the element this text is a label of.
    #[serde(default)]
    pub container_id: Option<ElementId>,
    #[serde(default)]
    pub frame_id: Option<ElementId>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub version: u32,
}

impl BindableShape {
    /// Create a new shape with a transparent background.
    pub fn new(kind: ShapeKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            x,
            y,
            width,
            height,
            angle: 0.0,
            stroke_width: 2.0,
            background: SerializableColor::transparent(),
            roundness: None,
            bound_elements: Vec::new(),
            container_id: None,
            frame_id: None,
            is_deleted: false,
            version: 1,
        }
    }

    /// Replace the generated id (for duplication and storage).
    pub fn with_id(mut self, id: ElementId) -> Self {
        self.id = id;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_background(mut self, background: SerializableColor) -> Self {
        self.background = background;
        self
    }

    pub fn with_roundness(mut self, roundness: Roundness) -> Self {
        self.roundness = Some(roundness);
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The unrotated box.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the shape body (not just its outline) counts for hit testing.
    pub fn is_filled(&self) -> bool {
        !self.background.is_transparent()
            || self.kind.is_always_solid()
            || self
                .bound_elements
                .iter()
                .any(|b| b.kind == BoundElementKind::Text)
    }

    pub fn corner_radius(&self, side: f64) -> f64 {
        self.roundness.map_or(0.0, |r| r.corner_radius(side))
    }

    pub(crate) fn apply_update(&mut self, update: &ElementUpdate) {
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        if let Some(width) = update.width {
            self.width = width;
        }
        if let Some(height) = update.height {
            self.height = height;
        }
        if let Some(bound) = &update.bound_elements {
            self.bound_elements = bound.clone();
        }
        if let Some(container_id) = update.container_id {
            self.container_id = container_id;
        }
        if let Some(frame_id) = update.frame_id {
            self.frame_id = frame_id;
        }
        if let Some(deleted) = update.is_deleted {
            self.is_deleted = deleted;
        }
    }
}
