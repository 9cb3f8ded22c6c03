//! Freehand drawing element.

use super::{ElementId, point_to_polyline_dist};
use crate::math::bounds_of_points;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A freehand stroke (series of local points). Never a binding target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Freedraw {
    pub(crate) id: ElementId,
    pub x: f64,
    pub y: f64,
    /// Points relative to `(x, y)`.
    pub points: Vec<Point>,
    #[serde(default)]
    pub frame_id: Option<ElementId>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub version: u32,
}

impl Freedraw {
    /// Create from scene points.
    pub fn from_points(points: &[Point]) -> Self {
        let origin = points.first().copied().unwrap_or(Point::ZERO);
        Self {
            id: Uuid::new_v4(),
            x: origin.x,
            y: origin.y,
            points: points
                .iter()
                .map(|p| Point::new(p.x - origin.x, p.y - origin.y))
                .collect(),
            frame_id: None,
            is_deleted: false,
            version: 1,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Points in scene coordinates.
    pub fn global_points(&self) -> Vec<Point> {
        self.points
            .iter()
            .map(|p| Point::new(self.x + p.x, self.y + p.y))
            .collect()
    }

    pub fn bounds(&self) -> Rect {
        bounds_of_points(&self.global_points())
    }

    /// Distance from a scene point to the stroke.
    pub fn distance_to(&self, point: Point) -> f64 {
        let points = self.global_points();
        if points.is_empty() {
            return f64::INFINITY;
        }
        point_to_polyline_dist(point, &points)
    }
}
