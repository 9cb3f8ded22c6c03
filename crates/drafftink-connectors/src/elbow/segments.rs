//! Fixed-segment handling: renormalize, release, move, and endpoint drag.
//!
//! Once a segment is pinned the connector keeps its exact segment count;
//! these handlers edit the existing polyline instead of rerouting it.

use super::data::ElbowArrowData;
use super::{RouteUpdate, normalize_arrow_element_update, route_and_simplify, validate_elbow_points};
use crate::config::{BASE_PADDING, DEDUP_THRESHOLD, RouteOptions};
use crate::error::{ConnectorError, invariant};
use crate::heading::{Heading, heading_for_point, vector_to_heading};
use crate::scene::ElementsMap;
use crate::shapes::{Connector, FixedSegment};
use kurbo::{Point, Vec2};

fn origin(arrow: &Connector) -> Vec2 {
    Vec2::new(arrow.x, arrow.y)
}

/// Signed padding away from a shape in the direction of `heading`.
fn outward(heading: Heading, magnitude: f64) -> f64 {
    if matches!(heading, Heading::Right | Heading::Down) {
        magnitude
    } else {
        -magnitude
    }
}

/// Merge collinear and degenerate runs while keeping pinned segments.
///
/// When no pinned segment survives, the connector is rerouted from scratch.
pub(super) fn handle_segment_renormalization<M: ElementsMap + ?Sized>(
    arrow: &Connector,
    elements: &M,
    options: RouteOptions,
) -> Option<RouteUpdate> {
    let Some(fixed) = arrow.fixed_segments.as_ref() else {
        return Some(RouteUpdate::keep(arrow, None));
    };
    let mut fixed = fixed.clone();
    let offset = origin(arrow);
    let globals: Vec<Point> = arrow.points.iter().map(|p| *p + offset).collect();

    // Collinear neighbours collapse into one segment.
    let mut merged: Vec<Point> = Vec::with_capacity(globals.len());
    for (i, &p) in globals.iter().enumerate() {
        let collinear = i >= 2 && {
            let prev = globals[i - 1];
            heading_for_point(p, prev) == heading_for_point(prev, globals[i - 2])
        };
        if collinear {
            if let Some(segment) = fixed.iter_mut().find(|s| s.index == i) {
                segment.start = globals[i - 2] - offset;
            }
            if let Some(pos) = fixed.iter().position(|s| s.index == i - 1) {
                fixed.remove(pos);
            }
            merged.pop();
            for segment in fixed.iter_mut().filter(|s| s.index > i - 1) {
                segment.index -= 1;
            }
        }
        merged.push(p);
    }

    // Degenerate segments take their two neighbours with them.
    let mut next: Vec<Point> = Vec::with_capacity(merged.len());
    for (i, &p) in merged.iter().enumerate() {
        if i >= 3 && merged[i - 2].distance(merged[i - 1]) < DEDUP_THRESHOLD {
            fixed.retain(|s| s.index != i - 1 && s.index != i - 2);
            next.truncate(next.len().saturating_sub(2));
            for segment in fixed.iter_mut().filter(|s| s.index > i - 2) {
                segment.index -= 2;
            }
            let horizontal = heading_for_point(p, merged[i - 1]).is_horizontal();
            next.push(Point::new(
                if horizontal { p.x } else { merged[i - 2].x },
                if horizontal { merged[i - 2].y } else { p.y },
            ));
            continue;
        }
        next.push(p);
    }

    let last = next.len().saturating_sub(1);
    fixed.retain(|s| s.index != 1 && s.index != last);

    if fixed.is_empty() {
        let local: Vec<Point> = next.iter().map(|p| *p - offset).collect();
        let route = route_and_simplify(
            arrow,
            elements,
            &local,
            arrow.start_binding.is_some(),
            RouteOptions {
                is_dragging: false,
                ..options
            },
        )?;
        return Some(normalize_arrow_element_update(&route, fixed, None, None));
    }

    invariant(
        validate_elbow_points(&next, DEDUP_THRESHOLD),
        ConnectorError::InvalidElbowPoints,
    )
    .ok()?;
    Some(normalize_arrow_element_update(
        &next,
        fixed,
        arrow.start_is_special,
        arrow.end_is_special,
    ))
}

/// Unpin one segment and reroute the span between its pinned neighbours.
pub(super) fn handle_segment_release<M: ElementsMap + ?Sized>(
    arrow: &Connector,
    fixed: &[FixedSegment],
    elements: &M,
    options: RouteOptions,
) -> Option<RouteUpdate> {
    let old = arrow.fixed_segments();
    let Some(deleted_pos) = old
        .iter()
        .position(|s| !fixed.iter().any(|f| f.index == s.index))
    else {
        return Some(RouteUpdate::keep(arrow, arrow.fixed_segments.clone()));
    };
    let deleted_idx = old[deleted_pos].index;
    let prev = deleted_pos.checked_sub(1).map(|i| old[i]);
    let next = old.get(deleted_pos + 1).copied();

    let offset = origin(arrow);
    let sub_origin = offset + prev.map_or(Vec2::ZERO, |s| s.end.to_vec2());
    let last = arrow.points.last().copied().unwrap_or(Point::ZERO);
    let target = next.map_or(last, |s| s.start) + offset;

    // The released span is routed as a standalone connector.
    let mut sub = arrow.clone();
    sub.x = sub_origin.x;
    sub.y = sub_origin.y;
    if prev.is_some() {
        sub.start_binding = None;
    }
    if next.is_some() {
        sub.end_binding = None;
    }
    sub.start_arrowhead = None;
    sub.end_arrowhead = None;

    let restored = route_and_simplify(
        &sub,
        elements,
        &[Point::ZERO, target - sub_origin],
        arrow.start_binding.is_some(),
        RouteOptions {
            is_dragging: false,
            ..options
        },
    )?;

    let mut points: Vec<Point> = Vec::with_capacity(arrow.points.len() + restored.len());
    if let Some(prev) = prev {
        points.extend(arrow.points.iter().take(prev.index).map(|p| *p + offset));
    }
    points.extend(restored.iter().copied());
    if let Some(next) = next {
        points.extend(arrow.points.iter().skip(next.index).map(|p| *p + offset));
    }

    let replaced = next.map_or(arrow.points.len(), |s| s.index) as isize
        - prev.map_or(0, |s| s.index) as isize
        - 1;
    let mut next_fixed: Vec<FixedSegment> = fixed
        .iter()
        .map(|s| {
            if s.index > deleted_idx {
                let index = s.index as isize - replaced + (restored.len() as isize - 1);
                FixedSegment {
                    index: index.max(0) as usize,
                    ..*s
                }
            } else {
                *s
            }
        })
        .collect();

    let mut simplified: Vec<Point> = Vec::with_capacity(points.len());
    for (i, &p) in points.iter().enumerate() {
        if i > 0 && i + 1 < points.len() {
            let prev_heading = heading_for_point(p, points[i - 1]);
            let next_heading = heading_for_point(points[i + 1], p);
            if prev_heading == next_heading {
                for segment in next_fixed.iter_mut().filter(|s| s.index > i) {
                    segment.index -= 1;
                }
                continue;
            }
            if prev_heading == next_heading.flip() {
                for segment in next_fixed.iter_mut().filter(|s| s.index > i) {
                    segment.index += 1;
                }
                simplified.push(p);
            }
        }
        simplified.push(p);
    }

    Some(normalize_arrow_element_update(
        &simplified,
        next_fixed,
        Some(false),
        Some(false),
    ))
}

/// Apply a dragged fixed segment to the polyline.
///
/// Neighbouring points and pinned segments are pulled into alignment, and
/// moving the first or last segment grows a stub so the connector still
/// leaves its shape perpendicular.
pub(super) fn handle_segment_move(
    arrow: &Connector,
    mut fixed: Vec<FixedSegment>,
    start_heading: Heading,
    end_heading: Heading,
    hovered_start: bool,
    hovered_end: bool,
) -> RouteUpdate {
    let old = arrow.fixed_segments();
    let active = (0..fixed.len()).find(|&i| match old.get(i) {
        Some(o) if o.index == fixed[i].index => {
            let s = fixed[i];
            let moved_x = s.start.x != o.start.x && s.end.x != o.end.x;
            let moved_y = s.start.y != o.start.y && s.end.y != o.end.y;
            moved_x != moved_y
        }
        _ => true,
    });
    let last_index = arrow.points.len().saturating_sub(1);
    let Some(active) = active.filter(|&i| (1..=last_index).contains(&fixed[i].index)) else {
        return RouteUpdate::keep(arrow, arrow.fixed_segments.clone());
    };

    let first_pinned = old.iter().any(|s| s.index == 1);
    let last_pinned = old.iter().any(|s| s.index == last_index);

    let length = fixed[active].start.distance(fixed[active].end);
    let magnitude = if length < BASE_PADDING + 5.0 {
        length / 2.0
    } else {
        BASE_PADDING
    };
    if !first_pinned && fixed[active].index == 1 && hovered_start {
        let pad = outward(start_heading, magnitude);
        let start = &mut fixed[active].start;
        if start_heading.is_horizontal() {
            start.x += pad;
        } else {
            start.y += pad;
        }
    }
    if !last_pinned && fixed[active].index == last_index && hovered_end {
        let pad = outward(end_heading, magnitude);
        let end = &mut fixed[active].end;
        if end_heading.is_horizontal() {
            end.x += pad;
        } else {
            end.y += pad;
        }
    }

    let offset = origin(arrow);
    let mut next_fixed: Vec<FixedSegment> = fixed
        .iter()
        .map(|s| FixedSegment::new(s.index, s.start + offset, s.end + offset))
        .collect();
    let mut points: Vec<Point> = arrow.points.iter().map(|p| *p + offset).collect();

    let end_idx = next_fixed[active].index;
    let start_idx = end_idx - 1;
    let start = next_fixed[active].start;
    let end = next_fixed[active].end;

    let prev_horizontal = (start_idx >= 1 && points[start_idx] != points[start_idx - 1])
        .then(|| heading_for_point(points[start_idx - 1], points[start_idx]).is_horizontal());
    let next_horizontal = (end_idx + 1 < points.len() && points[end_idx] != points[end_idx + 1])
        .then(|| heading_for_point(points[end_idx + 1], points[end_idx]).is_horizontal());

    if let Some(horizontal) = prev_horizontal {
        if horizontal {
            points[start_idx - 1].y = start.y;
        } else {
            points[start_idx - 1].x = start.x;
        }
    }
    points[start_idx] = start;
    points[end_idx] = end;
    if let Some(horizontal) = next_horizontal {
        if horizontal {
            points[end_idx + 1].y = end.y;
        } else {
            points[end_idx + 1].x = end.x;
        }
    }

    if let Some(prev) = next_fixed.iter_mut().find(|s| s.index == start_idx) {
        if heading_for_point(prev.end, prev.start).is_horizontal() {
            prev.start.y = start.y;
        } else {
            prev.start.x = start.x;
        }
        prev.end = start;
    }
    if let Some(next) = next_fixed.iter_mut().find(|s| s.index == end_idx + 1) {
        if heading_for_point(next.end, next.start).is_horizontal() {
            next.end.y = end.y;
        } else {
            next.end.x = end.x;
        }
        next.start = end;
    }

    let first = arrow.points.first().copied().unwrap_or(Point::ZERO) + offset;
    let last = arrow.points.last().copied().unwrap_or(Point::ZERO) + offset;

    if !first_pinned && start_idx == 0 {
        let horizontal = if hovered_start {
            start_heading.is_horizontal()
        } else {
            heading_for_point(points[1], points[0]).is_horizontal()
        };
        points.insert(
            0,
            Point::new(
                if horizontal { start.x } else { first.x },
                if horizontal { first.y } else { start.y },
            ),
        );
        if hovered_start {
            points.insert(0, first);
        }
        let shift = if hovered_start { 2 } else { 1 };
        for segment in &mut next_fixed {
            segment.index += shift;
        }
    }

    if !last_pinned && end_idx == last_index {
        let horizontal = end_heading.is_horizontal();
        points.push(Point::new(
            if horizontal { end.x } else { last.x },
            if horizontal { last.y } else { end.y },
        ));
        if hovered_end {
            points.push(last);
        }
    }

    let local = next_fixed
        .into_iter()
        .map(|s| FixedSegment::new(s.index, s.start - offset, s.end - offset))
        .collect();
    normalize_arrow_element_update(&points, local, Some(false), Some(false))
}

/// Move the endpoints of a connector with pinned segments.
///
/// Only the first and last runs change; the interior, and with it every
/// pinned segment, stays where it is.
pub(super) fn handle_endpoint_drag(
    arrow: &Connector,
    updated_points: &[Point],
    fixed: &[FixedSegment],
    data: &ElbowArrowData<'_>,
) -> RouteUpdate {
    let mut start_special = arrow.start_is_special;
    let mut end_special = arrow.end_is_special;
    let offset = origin(arrow);
    let n = updated_points.len();
    let globals: Vec<Point> = updated_points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == 0 || i == n - 1 {
                *p + offset
            } else {
                arrow.points.get(i).copied().unwrap_or(*p) + offset
            }
        })
        .collect();
    let last = n - 1;
    let at = |i: usize| globals[i.min(last)];
    let from_end = |k: usize| globals[n.saturating_sub(k)];
    let mut indices: Vec<usize> = fixed.iter().map(|s| s.index).collect();

    let start_skip = if start_special.unwrap_or(false) { 3 } else { 2 };
    let end_skip = if end_special.unwrap_or(false) { 3 } else { 2 };
    let inner = globals
        .iter()
        .skip(start_skip)
        .take(n.saturating_sub(start_skip + end_skip))
        .copied();

    let start_global = data.start_global;
    let end_global = data.end_global;
    let mut points = vec![start_global];

    {
        let special = start_special.unwrap_or(false);
        let second = at(if special { 2 } else { 1 });
        let third = at(if special { 3 } else { 2 });
        let start_horizontal = data.start_heading.is_horizontal();
        let second_horizontal = vector_to_heading(second - third).is_horizontal();

        if data.hovered_start.is_some() && start_horizontal == second_horizontal {
            let pad = outward(data.start_heading, BASE_PADDING);
            points.push(Point::new(
                if start_horizontal { start_global.x + pad } else { start_global.x },
                if start_horizontal { start_global.y } else { start_global.y + pad },
            ));
            points.push(Point::new(
                if second_horizontal { start_global.x + pad } else { third.x },
                if second_horizontal { third.y } else { start_global.y + pad },
            ));
            if !special {
                start_special = Some(true);
                indices.iter_mut().filter(|i| **i > 1).for_each(|i| *i += 1);
            }
        } else {
            points.push(Point::new(
                if second_horizontal { start_global.x } else { second.x },
                if second_horizontal { second.y } else { start_global.y },
            ));
            if special {
                start_special = Some(false);
                indices.iter_mut().filter(|i| **i > 1).for_each(|i| *i -= 1);
            }
        }
    }

    points.extend(inner);

    {
        let special = end_special.unwrap_or(false);
        let second_last = from_end(if special { 3 } else { 2 });
        let third_last = from_end(if special { 4 } else { 3 });
        let end_horizontal = data.end_heading.is_horizontal();
        let second_horizontal = heading_for_point(third_last, second_last).is_horizontal();

        if data.hovered_end.is_some() && end_horizontal == second_horizontal {
            let pad = outward(data.end_heading, BASE_PADDING);
            points.push(Point::new(
                if second_horizontal { end_global.x + pad } else { third_last.x },
                if second_horizontal { third_last.y } else { end_global.y + pad },
            ));
            points.push(Point::new(
                if end_horizontal { end_global.x + pad } else { end_global.x },
                if end_horizontal { end_global.y } else { end_global.y + pad },
            ));
            end_special = Some(true);
        } else {
            points.push(Point::new(
                if second_horizontal { end_global.x } else { second_last.x },
                if second_horizontal { second_last.y } else { end_global.y },
            ));
            if special {
                end_special = Some(false);
            }
        }
    }

    points.push(end_global);

    let anchor = start_global.to_vec2();
    let segments = indices
        .into_iter()
        .filter_map(|index| {
            let start = *points.get(index.checked_sub(1)?)?;
            let end = *points.get(index)?;
            Some(FixedSegment::new(index, start - anchor, end - anchor))
        })
        .collect();
    normalize_arrow_element_update(&points, segments, start_special, end_special)
}
