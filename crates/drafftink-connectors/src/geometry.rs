//! Shape geometry queries: rotated bounds, outline decomposition,
//! segment intersection and containment.
//!
//! Decomposed outlines are unrotated; callers counter-rotate their query
//! points around [`BindableShape::center`] first.

use crate::math::{bounds_of_points, rotate_point};
use crate::shapes::{BindableShape, ShapeKind};
use kurbo::{CubicBez, Line, ParamCurve, PathSeg, Point, Rect, RoundedRect, Shape as KurboShape};

/// Sides and corner curves of an unrotated outline.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub sides: Vec<Line>,
    pub corners: Vec<CubicBez>,
}

impl Outline {
    /// All pieces as path segments.
    pub fn segments(&self) -> impl Iterator<Item = PathSeg> + '_ {
        self.sides
            .iter()
            .map(|l| PathSeg::Line(*l))
            .chain(self.corners.iter().map(|c| PathSeg::Cubic(*c)))
    }
}

/// Rotated corners of the shape's box.
pub fn rotated_corners(shape: &BindableShape) -> [Point; 4] {
    let c = shape.center();
    let r = shape.rect();
    [
        rotate_point(Point::new(r.x0, r.y0), c, shape.angle),
        rotate_point(Point::new(r.x1, r.y0), c, shape.angle),
        rotate_point(Point::new(r.x1, r.y1), c, shape.angle),
        rotate_point(Point::new(r.x0, r.y1), c, shape.angle),
    ]
}

/// Axis-aligned box around the rotated shape, grown by `[up, right, down, left]`.
pub fn aabb_for_element(shape: &BindableShape, offset: [f64; 4]) -> Rect {
    let b = bounds_of_points(&rotated_corners(shape));
    Rect::new(
        b.x0 - offset[3],
        b.y0 - offset[0],
        b.x1 + offset[1],
        b.y1 + offset[2],
    )
}

/// Unrotated outline of a rectanguloid grown by `offset`.
pub fn deconstruct_rectanguloid(shape: &BindableShape, offset: f64) -> Outline {
    let base = shape.corner_radius(shape.width.min(shape.height));
    let r = shape.rect().inflate(offset, offset);
    let radius = (base + offset).min(r.width() / 2.0).min(r.height() / 2.0).max(0.0);

    let top = Line::new(Point::new(r.x0 + radius, r.y0), Point::new(r.x1 - radius, r.y0));
    let right = Line::new(Point::new(r.x1, r.y0 + radius), Point::new(r.x1, r.y1 - radius));
    let bottom = Line::new(Point::new(r.x1 - radius, r.y1), Point::new(r.x0 + radius, r.y1));
    let left = Line::new(Point::new(r.x0, r.y1 - radius), Point::new(r.x0, r.y0 + radius));

    if radius <= 0.0 {
        return Outline {
            sides: vec![top, right, bottom, left],
            corners: Vec::new(),
        };
    }

    let corner = |from: Point, vertex: Point, to: Point| {
        CubicBez::new(
            from,
            from.lerp(vertex, 2.0 / 3.0),
            to.lerp(vertex, 2.0 / 3.0),
            to,
        )
    };
    let corners = vec![
        corner(left.p1, Point::new(r.x0, r.y0), top.p0),
        corner(top.p1, Point::new(r.x1, r.y0), right.p0),
        corner(right.p1, Point::new(r.x1, r.y1), bottom.p0),
        corner(bottom.p1, Point::new(r.x0, r.y1), left.p0),
    ];
    Outline {
        sides: vec![top, right, bottom, left],
        corners,
    }
}

/// Vertices of the diamond (top, right, bottom, left), unrotated, grown so
/// every edge moves outward by `offset`.
pub fn diamond_vertices(shape: &BindableShape, offset: f64) -> [Point; 4] {
    let c = shape.center();
    let a = shape.width / 2.0;
    let b = shape.height / 2.0;
    let k = if offset != 0.0 && a > 0.0 && b > 0.0 {
        1.0 + offset * (1.0 / (a * a) + 1.0 / (b * b)).sqrt()
    } else {
        1.0
    };
    [
        Point::new(c.x, c.y - b * k),
        Point::new(c.x + a * k, c.y),
        Point::new(c.x, c.y + b * k),
        Point::new(c.x - a * k, c.y),
    ]
}

/// Unrotated outline of a diamond grown by `offset`.
pub fn deconstruct_diamond(shape: &BindableShape, offset: f64) -> Outline {
    let [top, right, bottom, left] = diamond_vertices(shape, offset);
    let half_w = top.x - left.x;
    let half_h = right.y - top.y;
    let (vr, hr) = match shape.roundness {
        Some(_) => (shape.corner_radius(half_w.abs()), shape.corner_radius(half_h.abs())),
        None => (half_w * 0.01, half_h * 0.01),
    };
    // Keep the corner inside its two edges.
    let vr = vr.min(half_w.abs() / 2.0);
    let hr = hr.min(half_h.abs() / 2.0);

    let corner = |from: Point, vertex: Point, to: Point| CubicBez::new(from, vertex, vertex, to);
    let corners = vec![
        corner(
            Point::new(right.x - vr, right.y - hr),
            right,
            Point::new(right.x - vr, right.y + hr),
        ),
        corner(
            Point::new(bottom.x + vr, bottom.y - hr),
            bottom,
            Point::new(bottom.x - vr, bottom.y - hr),
        ),
        corner(
            Point::new(left.x + vr, left.y + hr),
            left,
            Point::new(left.x + vr, left.y - hr),
        ),
        corner(
            Point::new(top.x - vr, top.y + hr),
            top,
            Point::new(top.x + vr, top.y + hr),
        ),
    ];
    let sides = (0..4)
        .map(|i| Line::new(corners[i].p3, corners[(i + 1) % 4].p0))
        .collect();
    Outline { sides, corners }
}

/// Unrotated outline for rectanguloids and diamonds. Ellipses have no
/// piecewise outline and yield an empty one.
pub fn deconstruct(shape: &BindableShape, offset: f64) -> Outline {
    match shape.kind {
        ShapeKind::Diamond => deconstruct_diamond(shape, offset),
        ShapeKind::Ellipse => Outline::default(),
        _ => deconstruct_rectanguloid(shape, offset),
    }
}

/// Intersections of a scene-space segment with the shape outline grown by `offset`.
pub fn intersect_element_with_line_segment(
    shape: &BindableShape,
    segment: Line,
    offset: f64,
) -> Vec<Point> {
    let center = shape.center();
    let local = Line::new(
        rotate_point(segment.p0, center, -shape.angle),
        rotate_point(segment.p1, center, -shape.angle),
    );

    let hits = match shape.kind {
        ShapeKind::Ellipse => intersect_ellipse(
            center,
            shape.width / 2.0 + offset,
            shape.height / 2.0 + offset,
            local,
        ),
        _ => {
            let outline = deconstruct(shape, offset);
            outline
                .segments()
                .flat_map(|seg| {
                    seg.intersect_line(local)
                        .into_iter()
                        .map(|hit| local.eval(hit.line_t))
                        .collect::<Vec<_>>()
                })
                .collect()
        }
    };

    let mut out: Vec<Point> = Vec::with_capacity(hits.len());
    for p in hits {
        let p = rotate_point(p, center, shape.angle);
        if !out.iter().any(|q| q.distance(p) < 1e-6) {
            out.push(p);
        }
    }
    out
}

/// Intersections of a segment with an axis-aligned ellipse.
fn intersect_ellipse(center: Point, a: f64, b: f64, seg: Line) -> Vec<Point> {
    if a <= 0.0 || b <= 0.0 {
        return Vec::new();
    }
    let p0 = seg.p0 - center;
    let d = seg.p1 - seg.p0;
    let qa = d.x * d.x / (a * a) + d.y * d.y / (b * b);
    let qb = 2.0 * (p0.x * d.x / (a * a) + p0.y * d.y / (b * b));
    let qc = p0.x * p0.x / (a * a) + p0.y * p0.y / (b * b) - 1.0;
    if qa == 0.0 {
        return Vec::new();
    }
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    [(-qb - sq) / (2.0 * qa), (-qb + sq) / (2.0 * qa)]
        .into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .map(|t| seg.eval(t))
        .collect()
}

/// Whether a scene point lies inside the shape body (outline included).
pub fn is_point_inside_shape(shape: &BindableShape, point: Point) -> bool {
    let c = shape.center();
    let p = rotate_point(point, c, -shape.angle);
    let a = shape.width / 2.0;
    let b = shape.height / 2.0;
    match shape.kind {
        ShapeKind::Ellipse => {
            if a <= 0.0 || b <= 0.0 {
                return false;
            }
            let dx = (p.x - c.x) / a;
            let dy = (p.y - c.y) / b;
            dx * dx + dy * dy <= 1.0
        }
        ShapeKind::Diamond => {
            if a <= 0.0 || b <= 0.0 {
                return false;
            }
            (p.x - c.x).abs() / a + (p.y - c.y).abs() / b <= 1.0
        }
        _ => {
            let radius = shape.corner_radius(shape.width.min(shape.height));
            if radius <= 0.0 {
                let r = shape.rect();
                return p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1;
            }
            RoundedRect::from_rect(shape.rect(), radius).contains(p)
        }
    }
}

/// Whether every extreme point of `inner` lies inside `outer`.
pub fn is_bindable_inside_other_bindable(inner: &BindableShape, outer: &BindableShape) -> bool {
    let extremes: Vec<Point> = match inner.kind {
        ShapeKind::Diamond => diamond_vertices(inner, 0.0)
            .into_iter()
            .map(|p| rotate_point(p, inner.center(), inner.angle))
            .collect(),
        _ => rotated_corners(inner).to_vec(),
    };
    extremes.into_iter().all(|p| is_point_inside_shape(outer, p))
}

/// Distance from `point` (relative to the ellipse center, unrotated) to an
/// axis-aligned ellipse with semi-axes `a` and `b`.
pub fn ellipse_distance(point: Point, a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        let seg_a = Point::new(-a.max(0.0), -b.max(0.0));
        let seg_b = Point::new(a.max(0.0), b.max(0.0));
        return crate::shapes::point_to_segment_dist(point, seg_a, seg_b);
    }
    let px = point.x.abs();
    let py = point.y.abs();
    let mut tx = std::f64::consts::FRAC_1_SQRT_2;
    let mut ty = std::f64::consts::FRAC_1_SQRT_2;

    for _ in 0..3 {
        let x = a * tx;
        let y = b * ty;
        let ex = (a * a - b * b) * tx.powi(3) / a;
        let ey = (b * b - a * a) * ty.powi(3) / b;
        let rx = x - ex;
        let ry = y - ey;
        let qx = px - ex;
        let qy = py - ey;
        let r = rx.hypot(ry);
        let q = qx.hypot(qy);
        if q == 0.0 {
            break;
        }
        tx = ((qx * r / q + ex) / a).clamp(0.0, 1.0);
        ty = ((qy * r / q + ey) / b).clamp(0.0, 1.0);
        let t = tx.hypot(ty);
        if t == 0.0 || !t.is_finite() {
            break;
        }
        tx /= t;
        ty /= t;
    }

    let nearest = Point::new(a * tx * point.x.signum(), b * ty * point.y.signum());
    let d = point.distance(nearest);
    if d.is_finite() { d } else { 0.0 }
}
