//! Connectors: arrows and lines that can bind to shapes.

use super::{BoundElementRef, ElementId, ElementUpdate};
use crate::math::bounds_of_points as points_extent;
use kurbo::{Affine, CubicBez, Line, PathSeg, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Arrow or plain line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectorKind {
    #[default]
    Arrow,
    Line,
}

/// Arrowhead decoration at a connector end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Arrowhead {
    #[default]
    Arrow,
    Triangle,
    Dot,
    Bar,
}

/// How a bound endpoint sits relative to its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingMode {
    /// The anchor lives inside the shape body.
    Inside,
    /// The anchor is snapped onto the outline with a fixed gap.
    Orbit,
}

/// Attachment of one connector end to a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub element_id: ElementId,
    pub mode: BindingMode,
    /// Anchor as a ratio of the shape's unrotated box. Never exactly 0.5.
    pub fixed_point: [f64; 2],
}

/// A user-pinned, axis-aligned run of an elbow connector.
///
/// `start` and `end` are local to the connector; `index` is the index of the
/// point that ends the segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedSegment {
    pub index: usize,
    pub start: Point,
    pub end: Point,
}

impl FixedSegment {
    pub fn new(index: usize, start: Point, end: Point) -> Self {
        Self { index, start, end }
    }

    /// Horizontal when the y extent is smaller than the x extent.
    pub fn is_horizontal(&self) -> bool {
        (self.start.y - self.end.y).abs() < (self.start.x - self.end.x).abs()
    }
}

/// An arrow or line element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub(crate) id: ElementId,
    pub kind: ConnectorKind,
    /// Scene position of local point (0, 0).
    pub x: f64,
    pub y: f64,
    /// Extents of the local points.
    pub width: f64,
    pub height: f64,
    /// Points relative to `(x, y)`. Always at least two.
    pub points: Vec<Point>,
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub start_binding: Option<Binding>,
    #[serde(default)]
    pub end_binding: Option<Binding>,
    /// Orthogonal routing.
    #[serde(default)]
    pub elbowed: bool,
    #[serde(default)]
    pub fixed_segments: Option<Vec<FixedSegment>>,
    #[serde(default)]
    pub start_is_special: Option<bool>,
    #[serde(default)]
    pub end_is_special: Option<bool>,
    #[serde(default)]
    pub start_arrowhead: Option<Arrowhead>,
    #[serde(default)]
    pub end_arrowhead: Option<Arrowhead>,
    pub stroke_width: f64,
    /// Smooth the polyline into a Catmull-Rom spline.
    #[serde(default)]
    pub curved: bool,
    /// Bound label, if any.
    #[serde(default)]
    pub bound_elements: Vec<BoundElementRef>,
    #[serde(default)]
    pub frame_id: Option<ElementId>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub version: u32,
}

impl Connector {
    /// Create a straight arrow between two scene points.
    pub fn new(start: Point, end: Point) -> Self {
        Self::from_points(ConnectorKind::Arrow, &[start, end])
    }

    /// Create an elbow arrow between two scene points.
    pub fn new_elbow(start: Point, end: Point) -> Self {
        let mut connector = Self::new(start, end);
        connector.elbowed = true;
        connector
    }

    /// Create a connector from scene points; the first point becomes the origin.
    pub fn from_points(kind: ConnectorKind, points: &[Point]) -> Self {
        let origin = points.first().copied().unwrap_or(Point::ZERO);
        let local: Vec<Point> = points
            .iter()
            .map(|p| Point::new(p.x - origin.x, p.y - origin.y))
            .collect();
        let extents = points_extent(&local);
        Self {
            id: Uuid::new_v4(),
            kind,
            x: origin.x,
            y: origin.y,
            width: extents.width(),
            height: extents.height(),
            points: local,
            angle: 0.0,
            start_binding: None,
            end_binding: None,
            elbowed: false,
            fixed_segments: None,
            start_is_special: None,
            end_is_special: None,
            start_arrowhead: None,
            end_arrowhead: match kind {
                ConnectorKind::Arrow => Some(Arrowhead::Arrow),
                ConnectorKind::Line => None,
            },
            stroke_width: 2.0,
            curved: false,
            bound_elements: Vec::new(),
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

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn is_arrow(&self) -> bool {
        self.kind == ConnectorKind::Arrow
    }

    /// Binding of one end (`start == true` for the first point).
    pub fn binding(&self, start: bool) -> Option<&Binding> {
        if start {
            self.start_binding.as_ref()
        } else {
            self.end_binding.as_ref()
        }
    }

    pub fn arrowhead(&self, start: bool) -> Option<Arrowhead> {
        if start {
            self.start_arrowhead
        } else {
            self.end_arrowhead
        }
    }

    /// Center of the unrotated point extents, in scene coordinates.
    pub fn center(&self) -> Point {
        let ext = points_extent(&self.points);
        Point::new(
            self.x + (ext.x0 + ext.x1) / 2.0,
            self.y + (ext.y0 + ext.y1) / 2.0,
        )
    }

    fn rotation(&self) -> Affine {
        if self.angle == 0.0 {
            Affine::IDENTITY
        } else {
            Affine::rotate_about(self.angle, self.center())
        }
    }

    /// Convert a local point to scene coordinates.
    pub fn global_point(&self, local: Point) -> Point {
        self.rotation() * Point::new(self.x + local.x, self.y + local.y)
    }

    /// Convert a scene point into this connector's local frame.
    pub fn local_point(&self, global: Point) -> Point {
        let p = self.rotation().inverse() * global;
        Point::new(p.x - self.x, p.y - self.y)
    }

    /// All points in scene coordinates.
    pub fn global_points(&self) -> Vec<Point> {
        let rot = self.rotation();
        self.points
            .iter()
            .map(|p| rot * Point::new(self.x + p.x, self.y + p.y))
            .collect()
    }

    /// Scene position of the first or last point.
    pub fn endpoint(&self, start: bool) -> Point {
        let local = if start {
            self.points.first()
        } else {
            self.points.last()
        };
        self.global_point(local.copied().unwrap_or(Point::ZERO))
    }

    /// Axis-aligned bounds of the rotated points.
    pub fn bounds(&self) -> Rect {
        points_extent(&self.global_points())
    }

    /// Drawn geometry in scene coordinates: straight segments, or cubic
    /// segments when the connector is curved.
    pub fn segments(&self) -> Vec<PathSeg> {
        let points = self.global_points();
        if points.len() < 2 {
            return Vec::new();
        }
        if !self.curved || self.elbowed || points.len() == 2 {
            return points
                .windows(2)
                .map(|w| PathSeg::Line(Line::new(w[0], w[1])))
                .collect();
        }
        // Catmull-Rom spline converted to cubic bezier
        let tension = 0.5;
        let last = points.len() - 1;
        (0..last)
            .map(|i| {
                let p0 = points[i.saturating_sub(1)];
                let p1 = points[i];
                let p2 = points[i + 1];
                let p3 = points[(i + 2).min(last)];

                let t1x = (p2.x - p0.x) * tension;
                let t1y = (p2.y - p0.y) * tension;
                let t2x = (p3.x - p1.x) * tension;
                let t2y = (p3.y - p1.y) * tension;

                let cp1 = Point::new(p1.x + t1x / 3.0, p1.y + t1y / 3.0);
                let cp2 = Point::new(p2.x - t2x / 3.0, p2.y - t2y / 3.0);
                PathSeg::Cubic(CubicBez::new(p1, cp1, cp2, p2))
            })
            .collect()
    }

    /// Fixed segments, empty when none are pinned.
    pub fn fixed_segments(&self) -> &[FixedSegment] {
        self.fixed_segments.as_deref().unwrap_or(&[])
    }

    pub(crate) fn apply_update(&mut self, update: &ElementUpdate) {
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        if let Some(points) = &update.points {
            self.points = points.clone();
            let ext = points_extent(&self.points);
            self.width = ext.width();
            self.height = ext.height();
        }
        if let Some(width) = update.width {
            self.width = width;
        }
        if let Some(height) = update.height {
            self.height = height;
        }
        if let Some(binding) = update.start_binding {
            self.start_binding = binding;
        }
        if let Some(binding) = update.end_binding {
            self.end_binding = binding;
        }
        if let Some(segments) = &update.fixed_segments {
            self.fixed_segments = segments.clone();
        }
        if let Some(special) = update.start_is_special {
            self.start_is_special = special;
        }
        if let Some(special) = update.end_is_special {
            self.end_is_special = special;
        }
        if let Some(bound) = &update.bound_elements {
            self.bound_elements = bound.clone();
        }
        if let Some(frame_id) = update.frame_id {
            self.frame_id = frame_id;
        }
        if let Some(deleted) = update.is_deleted {
            self.is_deleted = deleted;
        }
    }
}
