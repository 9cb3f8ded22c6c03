//! Sparse grid and A* search for orthogonal routes.
//!
//! Grid lines come only from the obstacle boxes, the common bounds and the
//! dongles, so the search space stays small. Bends cost the cube of the
//! start-to-end Manhattan distance, which makes the search prefer a few long
//! runs over many short jogs.

use super::data::ElbowArrowData;
use crate::heading::{Heading, vector_to_heading};
use crate::math::{manhattan, point_inside_bounds};
use kurbo::{Point, Rect};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A grid vertex with its search state.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub pos: Point,
    pub col: usize,
    pub row: usize,
    /// Cost of the best known path from the start.
    pub g: f64,
    pub closed: bool,
    pub visited: bool,
    pub parent: Option<usize>,
}

/// Nodes in row-major order.
#[derive(Debug, Clone)]
pub(crate) struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub nodes: Vec<Node>,
}

impl Grid {
    fn index(&self, col: isize, row: isize) -> Option<usize> {
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }

    /// Node sitting exactly at `point`, if any.
    pub fn node_at(&self, point: Point) -> Option<usize> {
        self.nodes.iter().position(|n| n.pos == point)
    }

    /// Neighbour indices in heading order: up, right, down, left.
    fn neighbors(&self, idx: usize) -> [(Heading, Option<usize>); 4] {
        let col = self.nodes[idx].col as isize;
        let row = self.nodes[idx].row as isize;
        [
            (Heading::Up, self.index(col, row - 1)),
            (Heading::Right, self.index(col + 1, row)),
            (Heading::Down, self.index(col, row + 1)),
            (Heading::Left, self.index(col - 1, row)),
        ]
    }
}

fn sorted_unique(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Build the routing grid.
///
/// A horizontal heading contributes its point's y as a grid row, a
/// vertical one its x as a column.
pub(crate) fn calculate_grid(
    aabbs: &[Rect],
    start: Point,
    start_heading: Heading,
    end: Point,
    end_heading: Heading,
    common: Rect,
) -> Grid {
    let mut xs = Vec::new();
    let mut ys = Vec::new();

    for (p, heading) in [(start, start_heading), (end, end_heading)] {
        if heading.is_horizontal() {
            ys.push(p.y);
        } else {
            xs.push(p.x);
        }
    }
    for aabb in aabbs.iter().chain(std::iter::once(&common)) {
        xs.extend([aabb.x0, aabb.x1]);
        ys.extend([aabb.y0, aabb.y1]);
    }

    let xs = sorted_unique(xs);
    let ys = sorted_unique(ys);
    let nodes = ys
        .iter()
        .enumerate()
        .flat_map(|(row, &y)| {
            xs.iter().enumerate().map(move |(col, &x)| Node {
                pos: Point::new(x, y),
                col,
                row,
                g: 0.0,
                closed: false,
                visited: false,
                parent: None,
            })
        })
        .collect();

    Grid {
        rows: ys.len(),
        cols: xs.len(),
        nodes,
    }
}

/// Lower bound on the segments still needed to reach `end` arriving along
/// `end_heading`, when leaving `node` along `heading`.
pub fn estimate_segment_count(
    node: Point,
    end: Point,
    heading: Heading,
    end_heading: Heading,
) -> u32 {
    let (x, y) = (node.x, node.y);
    let (ex, ey) = (end.x, end.y);
    match (end_heading, heading) {
        (Heading::Right, Heading::Right) => {
            if x >= ex {
                4
            } else if y == ey {
                0
            } else {
                2
            }
        }
        (Heading::Right, Heading::Up) => {
            if y > ey && x < ex {
                1
            } else {
                3
            }
        }
        (Heading::Right, Heading::Down) => {
            if y < ey && x < ex {
                1
            } else {
                3
            }
        }
        (Heading::Right, Heading::Left) => {
            if y == ey {
                4
            } else {
                2
            }
        }
        (Heading::Left, Heading::Right) => {
            if y == ey {
                4
            } else {
                2
            }
        }
        (Heading::Left, Heading::Up) => {
            if y > ey && x > ex {
                1
            } else {
                3
            }
        }
        (Heading::Left, Heading::Down) => {
            if y < ey && x > ex {
                1
            } else {
                3
            }
        }
        (Heading::Left, Heading::Left) => {
            if x <= ex {
                4
            } else if y == ey {
                0
            } else {
                2
            }
        }
        (Heading::Up, Heading::Right) => {
            if y > ey && x < ex {
                1
            } else {
                3
            }
        }
        (Heading::Up, Heading::Up) => {
            if y >= ey {
                4
            } else if x == ex {
                0
            } else {
                2
            }
        }
        (Heading::Up, Heading::Down) => {
            if x == ex {
                4
            } else {
                2
            }
        }
        (Heading::Up, Heading::Left) => {
            if y > ey && x > ex {
                1
            } else {
                3
            }
        }
        (Heading::Down, Heading::Right) => {
            if y < ey && x < ex {
                1
            } else {
                3
            }
        }
        (Heading::Down, Heading::Up) => {
            if x == ex {
                4
            } else {
                2
            }
        }
        (Heading::Down, Heading::Down) => {
            if y <= ey {
                4
            } else if x == ex {
                0
            } else {
                2
            }
        }
        (Heading::Down, Heading::Left) => {
            if y < ey && x > ex {
                1
            } else {
                3
            }
        }
    }
}

/// Heap entry; lower `f` first, then insertion order.
#[derive(Debug, Clone, Copy)]
struct Open {
    f: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for Open {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Open {}

impl PartialOrd for Open {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Open {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A* from `start` to `end` over `grid`, never stepping through the inside
/// of `obstacles` and never doubling back.
///
/// Returns node indices from start to end, or `None` when no route exists.
pub(crate) fn astar(
    grid: &mut Grid,
    start: usize,
    end: usize,
    start_heading: Heading,
    end_heading: Heading,
    obstacles: &[Rect],
) -> Option<Vec<usize>> {
    let bend_multiplier = manhattan(grid.nodes[start].pos, grid.nodes[end].pos);
    let bend_cost = bend_multiplier.powi(3);
    let estimate_weight = bend_multiplier.powi(2);
    let end_pos = grid.nodes[end].pos;

    let mut open = BinaryHeap::new();
    let mut seq = 0u64;
    open.push(Open {
        f: 0.0,
        seq,
        node: start,
    });

    while let Some(Open { node: current, .. }) = open.pop() {
        if grid.nodes[current].closed {
            continue;
        }
        if current == end {
            return Some(path_to(grid, start, current));
        }
        grid.nodes[current].closed = true;

        let current_pos = grid.nodes[current].pos;
        let previous_heading = grid.nodes[current]
            .parent
            .map_or(start_heading, |p| vector_to_heading(current_pos - grid.nodes[p].pos));

        for (heading, neighbor) in grid.neighbors(current) {
            let Some(neighbor) = neighbor else {
                continue;
            };
            if grid.nodes[neighbor].closed {
                continue;
            }

            let neighbor_pos = grid.nodes[neighbor].pos;
            let half_point = current_pos.midpoint(neighbor_pos);
            if obstacles.iter().any(|aabb| point_inside_bounds(half_point, *aabb)) {
                continue;
            }

            let reverse = previous_heading.flip() == heading
                || (neighbor == start && heading == start_heading)
                || (neighbor == end && heading == end_heading);
            if reverse {
                continue;
            }

            let g = grid.nodes[current].g
                + manhattan(neighbor_pos, current_pos)
                + if previous_heading != heading { bend_cost } else { 0.0 };

            let n = &mut grid.nodes[neighbor];
            if !n.visited || g < n.g {
                let estimate = estimate_segment_count(neighbor_pos, end_pos, heading, end_heading);
                let h = manhattan(end_pos, neighbor_pos) + f64::from(estimate) * estimate_weight;
                n.visited = true;
                n.parent = Some(current);
                n.g = g;
                seq += 1;
                open.push(Open {
                    f: g + h,
                    seq,
                    node: neighbor,
                });
            }
        }
    }

    None
}

fn path_to(grid: &Grid, start: usize, node: usize) -> Vec<usize> {
    let mut path = vec![node];
    let mut current = node;
    while let Some(parent) = grid.nodes[current].parent {
        path.push(parent);
        current = parent;
    }
    if path.last() != Some(&start) {
        path.push(start);
    }
    path.reverse();
    path
}

/// Route between the two anchors of `data`: anchor, dongle, grid path,
/// dongle, anchor. `start_bound` keeps the search off the start anchor.
pub(crate) fn route_elbow_arrow(
    data: &ElbowArrowData<'_>,
    start_bound: bool,
) -> Option<Vec<Point>> {
    let [start_aabb, end_aabb] = data.dynamic_aabbs;
    let mut grid = calculate_grid(
        &data.dynamic_aabbs,
        data.start_dongle,
        data.start_heading,
        data.end_dongle,
        data.end_heading,
        data.common_bounds,
    );

    let start_dongle = grid.node_at(data.start_dongle);
    let end_dongle = grid.node_at(data.end_dongle);

    // The true end points are never stepped on.
    if data.hovered_end.is_some() {
        if let Some(idx) = grid.node_at(data.end_global) {
            grid.nodes[idx].closed = true;
        }
    }
    if start_bound {
        if let Some(idx) = grid.node_at(data.start_global) {
            grid.nodes[idx].closed = true;
        }
    }

    let (Some(start), Some(end)) = (start_dongle, end_dongle) else {
        log::debug!("elbow route dongles are off the grid");
        return None;
    };

    let dongle_overlap = point_inside_bounds(grid.nodes[start].pos, end_aabb)
        || point_inside_bounds(grid.nodes[end].pos, start_aabb);
    let obstacles: &[Rect] = if dongle_overlap { &[] } else { &data.dynamic_aabbs };

    let Some(path) = astar(
        &mut grid,
        start,
        end,
        data.start_heading,
        data.end_heading,
        obstacles,
    ) else {
        log::debug!(
            "no elbow route from {:?} to {:?}",
            data.start_global,
            data.end_global
        );
        return None;
    };

    let mut points = Vec::with_capacity(path.len() + 2);
    points.push(data.start_global);
    points.extend(path.into_iter().map(|idx| grid.nodes[idx].pos));
    points.push(data.end_global);
    Some(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_is_row_major_and_deduplicated() {
        let aabbs = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(10.0, 0.0, 30.0, 10.0)];
        let grid = calculate_grid(
            &aabbs,
            Point::new(10.0, 5.0),
            Heading::Right,
            Point::new(10.0, 5.0),
            Heading::Left,
            Rect::new(0.0, 0.0, 30.0, 10.0),
        );
        assert_eq!(grid.cols, 3);
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.nodes[grid.cols + 1].pos, Point::new(10.0, 5.0));
        assert_eq!(grid.node_at(Point::new(30.0, 10.0)), Some(8));
        assert_eq!(grid.node_at(Point::new(31.0, 10.0)), None);
    }

    #[test]
    fn test_estimate_segment_count_table() {
        let end = Point::new(100.0, 100.0);
        let count = |x, y, heading, end_heading| {
            estimate_segment_count(Point::new(x, y), end, heading, end_heading)
        };
        // Already lined up and heading the right way.
        assert_eq!(count(0.0, 100.0, Heading::Right, Heading::Right), 0);
        // Overshot: has to loop around.
        assert_eq!(count(200.0, 100.0, Heading::Right, Heading::Right), 4);
        assert_eq!(count(0.0, 50.0, Heading::Right, Heading::Right), 2);
        assert_eq!(count(0.0, 150.0, Heading::Up, Heading::Right), 1);
        assert_eq!(count(0.0, 50.0, Heading::Up, Heading::Right), 3);
        assert_eq!(count(100.0, 200.0, Heading::Down, Heading::Down), 0);
        assert_eq!(count(100.0, 0.0, Heading::Down, Heading::Down), 4);
        assert_eq!(count(100.0, 0.0, Heading::Up, Heading::Down), 4);
        assert_eq!(count(200.0, 100.0, Heading::Left, Heading::Left), 0);
    }

    #[test]
    fn test_astar_straight_line() {
        let aabbs = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(90.0, 0.0, 100.0, 10.0)];
        let mut grid = calculate_grid(
            &aabbs,
            Point::new(10.0, 5.0),
            Heading::Right,
            Point::new(90.0, 5.0),
            Heading::Left,
            Rect::new(0.0, 0.0, 100.0, 10.0),
        );
        let start = grid.node_at(Point::new(10.0, 5.0)).unwrap();
        let end = grid.node_at(Point::new(90.0, 5.0)).unwrap();
        let path = astar(&mut grid, start, end, Heading::Right, Heading::Left, &aabbs).unwrap();
        let points: Vec<Point> = path.iter().map(|i| grid.nodes[*i].pos).collect();
        assert_eq!(points, vec![Point::new(10.0, 5.0), Point::new(90.0, 5.0)]);
    }

    #[test]
    fn test_astar_detours_around_obstacle() {
        // A wall between start and end forces the route over or under it.
        let wall = Rect::new(40.0, -50.0, 60.0, 50.0);
        let aabbs = [wall];
        let mut grid = calculate_grid(
            &aabbs,
            Point::new(0.0, 0.0),
            Heading::Right,
            Point::new(100.0, 0.0),
            Heading::Left,
            Rect::new(0.0, -60.0, 100.0, 60.0),
        );
        let start = grid.node_at(Point::new(0.0, 0.0)).unwrap();
        let end = grid.node_at(Point::new(100.0, 0.0)).unwrap();
        let path = astar(&mut grid, start, end, Heading::Right, Heading::Left, &aabbs).unwrap();
        let points: Vec<Point> = path.iter().map(|i| grid.nodes[*i].pos).collect();
        for w in points.windows(2) {
            assert!(w[0].x == w[1].x || w[0].y == w[1].y);
            assert!(!point_inside_bounds(w[0].midpoint(w[1]), wall));
        }
        assert!(points.iter().any(|p| p.y.abs() >= 50.0));
    }

    #[test]
    fn test_astar_reports_unreachable_end() {
        // The end sits strictly inside an obstacle.
        let cage = Rect::new(50.0, -50.0, 150.0, 50.0);
        let mut grid = calculate_grid(
            &[cage],
            Point::new(0.0, 0.0),
            Heading::Right,
            Point::new(100.0, 0.0),
            Heading::Up,
            Rect::new(0.0, -50.0, 150.0, 50.0),
        );
        let start = grid.node_at(Point::new(0.0, 0.0)).unwrap();
        let end = grid.node_at(Point::new(100.0, 0.0)).unwrap();
        assert!(astar(&mut grid, start, end, Heading::Right, Heading::Up, &[cage]).is_none());
    }
}
