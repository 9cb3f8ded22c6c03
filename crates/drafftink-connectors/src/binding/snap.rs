//! Anchor snapping for bound connector ends.
//!
//! Orbiting anchors are pulled onto a shape's grown outline, toward side
//! midpoints and the center, and away from rectangle corners.

use super::fixed_point::binding_gap;
use crate::config::FIXED_BINDING_DISTANCE;
use crate::geometry::{aabb_for_element, intersect_element_with_line_segment};
use crate::heading::heading_for_point_from_element;
use crate::math::{normalize, rotate_point};
use crate::shapes::{BindableShape, Connector, ShapeKind};
use kurbo::{Line, Point};

/// Squared distance under which two points are treated as the same.
const PRECISION: f64 = 1e-4;

/// Fraction of the shape size used as the midpoint snap threshold.
const MID_SNAP_TOLERANCE: f64 = 0.05;

/// Fraction of the smaller side within which a point snaps to the center.
const CENTER_SNAP_RATIO: f64 = 0.25;

/// Center used by midpoint snapping, slightly off the true center so the
/// side tests never tie.
fn snap_center(shape: &BindableShape) -> Point {
    Point::new(
        shape.x + shape.width / 2.0 - 0.1,
        shape.y + shape.height / 2.0 - 0.1,
    )
}

/// Pull `p` onto the shape center when it is close enough to it.
pub fn snap_to_center(shape: &BindableShape, p: Point) -> Point {
    let center = shape.center();
    if p.distance(center) < shape.width.min(shape.height) * CENTER_SNAP_RATIO {
        center
    } else {
        p
    }
}

/// Pull `p` onto the nearest side midpoint (or diamond quarter point),
/// pushed out by the binding gap.
///
/// The snap threshold is 5% of the side, clamped to `[5, 80]` px.
pub fn snap_to_mid(shape: &BindableShape, p: Point) -> Point {
    let BindableShape {
        x,
        y,
        width,
        height,
        angle,
        ..
    } = *shape;
    let center = snap_center(shape);
    let local = rotate_point(p, center, -angle);
    let gap = binding_gap(shape);

    let vertical_threshold = (MID_SNAP_TOLERANCE * height).clamp(5.0, 80.0);
    let horizontal_threshold = (MID_SNAP_TOLERANCE * width).clamp(5.0, 80.0);

    // Too close to the center to pick a side reliably.
    if center.distance(local) < gap {
        return p;
    }

    let near_middle_row =
        local.y > center.y - vertical_threshold && local.y < center.y + vertical_threshold;
    let near_middle_column =
        local.x > center.x - horizontal_threshold && local.x < center.x + horizontal_threshold;

    let snapped = if local.x <= x + width / 2.0 && near_middle_row {
        Some(Point::new(x - gap, center.y))
    } else if local.y <= y + height / 2.0 && near_middle_column {
        Some(Point::new(center.x, y - gap))
    } else if local.x >= x + width / 2.0 && near_middle_row {
        Some(Point::new(x + width + gap, center.y))
    } else if local.y >= y + height / 2.0 && near_middle_column {
        Some(Point::new(center.x, y + height + gap))
    } else if shape.kind == ShapeKind::Diamond {
        let threshold = horizontal_threshold.max(vertical_threshold);
        [
            Point::new(x + width / 4.0 - gap, y + height / 4.0 - gap),
            Point::new(x + 3.0 * width / 4.0 + gap, y + height / 4.0 - gap),
            Point::new(x + width / 4.0 - gap, y + 3.0 * height / 4.0 + gap),
            Point::new(x + 3.0 * width / 4.0 + gap, y + 3.0 * height / 4.0 + gap),
        ]
        .into_iter()
        .find(|q| q.distance(local) < threshold)
    } else {
        None
    };

    match snapped {
        Some(q) => rotate_point(q, center, angle),
        None => p,
    }
}

/// Move a point lying in a rectangle's corner region onto the nearer of
/// the two adjacent sides, one binding gap out.
pub fn avoid_rectangular_corner(shape: &BindableShape, p: Point) -> Point {
    let center = shape.center();
    let local = rotate_point(p, center, -shape.angle);
    let gap = binding_gap(shape);
    let (sx, sy, w, h) = (shape.x, shape.y, shape.width, shape.height);

    let moved = if local.x < sx && local.y < sy {
        // Top left
        if local.y - sy > -gap {
            Point::new(sx - gap, sy)
        } else {
            Point::new(sx, sy - gap)
        }
    } else if local.x < sx && local.y > sy + h {
        // Bottom left
        if local.x - sx > -gap {
            Point::new(sx, sy + h + gap)
        } else {
            Point::new(sx - gap, sy + h)
        }
    } else if local.x > sx + w && local.y > sy + h {
        // Bottom right
        if local.x - sx < w + gap {
            Point::new(sx + w, sy + h + gap)
        } else {
            Point::new(sx + w + gap, sy + h)
        }
    } else if local.x > sx + w && local.y < sy {
        // Top right
        if local.x - sx < w + gap {
            Point::new(sx + w, sy - gap)
        } else {
            Point::new(sx + w + gap, sy)
        }
    } else {
        return p;
    };

    rotate_point(moved, center, shape.angle)
}

/// The in-connector neighbour of an endpoint, in scene coordinates.
fn adjacent_point(connector: &Connector, start: bool) -> Point {
    let n = connector.points.len();
    let idx = if start { 1 } else { n.saturating_sub(2) };
    connector
        .points
        .get(idx)
        .map(|p| connector.global_point(*p))
        .unwrap_or_else(|| connector.endpoint(start))
}

fn nearest_to(points: Vec<Point>, target: Point) -> Option<Point> {
    points
        .into_iter()
        .min_by(|a, b| a.distance_squared(target).total_cmp(&b.distance_squared(target)))
}

/// Where a connector end should sit on the target's outline.
///
/// Elbow connectors snap to side midpoints and leave the shape
/// perpendicular to the side they face; other connectors keep the
/// direction from their neighbouring point. `custom_intersector` replaces
/// the probing segment.
pub fn bind_point_to_snap_to_element_outline(
    connector: &Connector,
    shape: &BindableShape,
    start: bool,
    custom_intersector: Option<Line>,
) -> Point {
    let elbowed = connector.elbowed;
    let point = connector.endpoint(start);

    if connector.points.len() < 2 {
        return point;
    }

    let edge = if shape.kind.is_rectanguloid() && elbowed {
        avoid_rectangular_corner(shape, point)
    } else {
        point
    };
    let adjacent = match custom_intersector {
        Some(line) if !elbowed => line.p1,
        _ => adjacent_point(connector, start),
    };
    let gap = binding_gap(shape);
    let aabb = aabb_for_element(shape, [0.0; 4]);
    let center = aabb.center();
    let reach = shape.width.max(shape.height) * 2.0;

    let intersection = if elbowed {
        let is_horizontal = heading_for_point_from_element(shape, aabb, point).is_horizontal();
        let snap = snap_to_mid(shape, edge);
        let other = Point::new(
            if is_horizontal { center.x } else { snap.x },
            if is_horizontal { snap.y } else { center.y },
        );
        let intersector = custom_intersector
            .unwrap_or_else(|| Line::new(other, other + normalize(snap - other) * reach));
        nearest_to(
            intersect_element_with_line_segment(shape, intersector, gap),
            intersector.p0,
        )
        .or_else(|| {
            // Retry along the other axis.
            let another = Point::new(
                if is_horizontal { snap.x } else { center.x },
                if is_horizontal { center.y } else { snap.y },
            );
            let fallback = Line::new(another, another + normalize(snap - another) * reach);
            nearest_to(
                intersect_element_with_line_segment(shape, fallback, FIXED_BINDING_DISTANCE),
                another,
            )
        })
    } else {
        let intersector = custom_intersector.unwrap_or_else(|| {
            let half = normalize(edge - adjacent)
                * (edge.distance(adjacent) + shape.width.max(shape.height) + gap * 2.0);
            Line::new(adjacent + half, adjacent - half)
        });
        if edge.distance(adjacent) < 1.0 {
            Some(edge)
        } else {
            nearest_to(intersect_element_with_line_segment(shape, intersector, gap), adjacent)
        }
    };

    match intersection {
        Some(hit) if edge.distance_squared(hit) >= PRECISION => hit,
        _ => edge,
    }
}
