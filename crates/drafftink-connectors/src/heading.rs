//! Compass headings for orthogonal routing.

use crate::geometry::aabb_for_element;
use crate::math::rotate_point;
use crate::shapes::{BindableShape, ShapeKind};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// One of the four axis directions (screen coordinates, y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    Up,
    Right,
    Down,
    Left,
}

impl Heading {
    /// Unit vector of the heading.
    pub fn vector(self) -> Vec2 {
        match self {
            Heading::Up => Vec2::new(0.0, -1.0),
            Heading::Right => Vec2::new(1.0, 0.0),
            Heading::Down => Vec2::new(0.0, 1.0),
            Heading::Left => Vec2::new(-1.0, 0.0),
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Heading::Up => Heading::Down,
            Heading::Right => Heading::Left,
            Heading::Down => Heading::Up,
            Heading::Left => Heading::Right,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Heading::Left | Heading::Right)
    }

    pub fn is_vertical(self) -> bool {
        !self.is_horizontal()
    }
}

/// Classify a vector into the heading of its dominant axis.
///
/// Exact diagonals resolve to `Left` on the left half-plane and `Up` on the
/// right one.
pub fn vector_to_heading(v: Vec2) -> Heading {
    let abs_x = v.x.abs();
    let abs_y = v.y.abs();
    if v.x > abs_y {
        Heading::Right
    } else if v.x <= -abs_y {
        Heading::Left
    } else if v.y > abs_x {
        Heading::Down
    } else {
        Heading::Up
    }
}

/// Heading of `p` as seen from `origin`.
pub fn heading_for_point(p: Point, origin: Point) -> Heading {
    vector_to_heading(p - origin)
}

pub fn compare_heading(a: Heading, b: Heading) -> bool {
    a == b
}

pub fn flip_heading(h: Heading) -> Heading {
    h.flip()
}

pub fn heading_is_horizontal(h: Heading) -> bool {
    h.is_horizontal()
}

pub fn heading_is_vertical(h: Heading) -> bool {
    h.is_vertical()
}

/// Inclusive point-in-triangle test.
fn triangle_includes_point(a: Point, b: Point, c: Point, p: Point) -> bool {
    let d1 = (p - b).cross(a - b);
    let d2 = (p - c).cross(b - c);
    let d3 = (p - a).cross(c - a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Scale `p` away from `origin` by `factor`.
fn scale_from(p: Point, origin: Point, factor: f64) -> Point {
    origin + (p - origin) * factor
}

/// Which side of the shape the point `p` faces.
///
/// `aabb` is the (possibly inflated) box the caller routes around. The test
/// runs in the shape's own frame and the result is rotated back, so small
/// rotations of shape and point together never change the answer.
pub fn heading_for_point_from_element(shape: &BindableShape, aabb: Rect, p: Point) -> Heading {
    const SEARCH_CONE_MULTIPLIER: f64 = 2.0;

    let center = aabb.center();
    let local_p = rotate_point(p, center, -shape.angle);

    // The unrotated box, grown by whatever the caller added around the shape.
    let raw = aabb_for_element(shape, [0.0; 4]);
    let grow_x = ((aabb.width() - raw.width()) / 2.0).max(0.0);
    let grow_y = ((aabb.height() - raw.height()) / 2.0).max(0.0);
    let half_w = shape.width / 2.0 + grow_x;
    let half_h = shape.height / 2.0 + grow_y;
    let local_box = Rect::new(
        center.x - half_w,
        center.y - half_h,
        center.x + half_w,
        center.y + half_h,
    );

    let local_heading = if shape.kind == ShapeKind::Diamond {
        heading_for_point_in_diamond(local_box, local_p)
    } else {
        let tl = scale_from(Point::new(local_box.x0, local_box.y0), center, SEARCH_CONE_MULTIPLIER);
        let tr = scale_from(Point::new(local_box.x1, local_box.y0), center, SEARCH_CONE_MULTIPLIER);
        let br = scale_from(Point::new(local_box.x1, local_box.y1), center, SEARCH_CONE_MULTIPLIER);
        let bl = scale_from(Point::new(local_box.x0, local_box.y1), center, SEARCH_CONE_MULTIPLIER);

        if triangle_includes_point(tl, tr, center, local_p) {
            Heading::Up
        } else if triangle_includes_point(tr, br, center, local_p) {
            Heading::Right
        } else if triangle_includes_point(br, bl, center, local_p) {
            Heading::Down
        } else if triangle_includes_point(bl, tl, center, local_p) {
            Heading::Left
        } else {
            // Beyond every search cone.
            vector_to_heading(local_p - center)
        }
    };

    if shape.angle == 0.0 {
        return local_heading;
    }
    vector_to_heading((Affine::rotate(shape.angle) * local_heading.vector().to_point()).to_vec2())
}

/// Quadrant and bisector test against the diamond's vertices.
fn heading_for_point_in_diamond(bounds: Rect, p: Point) -> Heading {
    const VERTEX_SHRINK: f64 = 0.95;

    let c = bounds.center();
    let top = scale_from(Point::new(c.x, bounds.y0), c, VERTEX_SHRINK);
    let right = scale_from(Point::new(bounds.x1, c.y), c, VERTEX_SHRINK);
    let bottom = scale_from(Point::new(c.x, bounds.y1), c, VERTEX_SHRINK);
    let left = scale_from(Point::new(bounds.x0, c.y), c, VERTEX_SHRINK);

    let v = p - c;
    // Pick the edge of the quadrant the point is in, then decide which of its
    // two vertices the point is closer to in angle.
    let (from, to, first, second) = match (v.x >= 0.0, v.y < 0.0) {
        (true, true) => (top, right, Heading::Up, Heading::Right),
        (true, false) => (right, bottom, Heading::Right, Heading::Down),
        (false, false) => (bottom, left, Heading::Down, Heading::Left),
        (false, true) => (left, top, Heading::Left, Heading::Up),
    };
    let bisector = from.midpoint(to) - c;
    if bisector.cross(v) < 0.0 {
        first
    } else {
        second
    }
}
