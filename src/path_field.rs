//! The flow field: a shortest path tree rooted at the target, plus the cache that decides
//! which cells may be blocked without cutting the start off from the target.
use crate::grid::NodeMap;
use crate::node::OccupationAvailability::{CanOccupy, CannotOccupy, Undefined};
use grid_util::grid::{BoolGrid, ValueGrid};
use grid_util::point::Point;
use itertools::Itertools;
use log::{debug, info, trace, warn};
use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};

/// Entry of the open set. Ordered by weight first and by coordinates second so that the
/// expansion order, and with it the resulting tree, is the same on every run.
#[derive(Clone, Copy, Debug)]
struct FieldEntry {
    weight: f32,
    point: Point,
}

impl Eq for FieldEntry {}

impl PartialEq for FieldEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for FieldEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then(self.point.x.cmp(&other.point.x))
            .then(self.point.y.cmp(&other.point.y))
    }
}

/// Maintains the flow field of a [Grid](crate::Grid) and the occupation cache derived from it.
#[derive(Clone, Debug)]
pub struct PathField {
    start: Point,
    target: Point,
    needs_update: bool,
    probe_count: usize,
}

impl PathField {
    pub(crate) fn new(start: Point, target: Point) -> PathField {
        PathField {
            start,
            target,
            needs_update: false,
            probe_count: 0,
        }
    }
    pub fn start(&self) -> Point {
        self.start
    }
    pub fn target(&self) -> Point {
        self.target
    }
    /// Whether the grid (probably) changed since the last recompute. Set by a successful probe
    /// and by raw occupancy writes, cleared by cache hits, failed probes and recomputes.
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }
    /// Number of reachability probes run so far, i.e. cache misses of
    /// [can_occupy](crate::Grid::can_occupy).
    pub fn probe_count(&self) -> usize {
        self.probe_count
    }
    pub(crate) fn request_update(&mut self) {
        self.needs_update = true;
    }

    /// Runs Dijkstra from the target over the whole grid, then resets the occupation cache.
    pub(crate) fn update_field(&mut self, nodes: &mut NodeMap) {
        for node in nodes.iter_mut() {
            node.reset_weight();
        }
        let mut to_see = BTreeSet::new();
        if let Some(target) = nodes.get_mut(self.target) {
            target.path_weight = 0.0;
            to_see.insert(FieldEntry {
                weight: 0.0,
                point: self.target,
            });
        }
        let mut expanded = 0;
        while let Some(FieldEntry { weight, point }) = to_see.pop_first() {
            expanded += 1;
            for (neighbour, cost) in nodes.neighborhood_points_and_cost(point) {
                let new_weight = weight + cost;
                let Some(node) = nodes.get_mut(neighbour) else {
                    continue;
                };
                if new_weight < node.path_weight {
                    // No decrease-key on the set, drop the stale entry before reinserting
                    if node.path_weight.is_finite() {
                        to_see.remove(&FieldEntry {
                            weight: node.path_weight,
                            point: neighbour,
                        });
                    }
                    node.path_weight = new_weight;
                    node.next_node = Some(point);
                    to_see.insert(FieldEntry {
                        weight: new_weight,
                        point: neighbour,
                    });
                }
            }
        }
        info!(
            "Updated flow field towards {}: {} of {} nodes reachable",
            self.target,
            expanded,
            nodes.len()
        );
        self.reset_cache(nodes);
    }

    /// Marks everything as safe to occupy except the walk from start to target and the corners
    /// flanking its diagonal hops, which need a probe first.
    fn reset_cache(&mut self, nodes: &mut NodeMap) {
        for node in nodes.iter_mut() {
            node.occupation_availability = CanOccupy;
        }
        let critical_path = nodes.chain(self.start).collect::<Vec<_>>();
        if critical_path.last() != Some(&self.target) {
            warn!(
                "Start {} is cut off from target {}, occupation cache is unreliable",
                self.start, self.target
            );
        }
        for &p in &critical_path {
            nodes.set_availability(p, Undefined);
        }
        for (a, b) in critical_path.iter().tuple_windows() {
            if is_diagonal(*a, *b) {
                nodes.set_availability(Point::new(a.x, b.y), Undefined);
                nodes.set_availability(Point::new(b.x, a.y), Undefined);
            }
        }
        nodes.set_availability(self.start, CannotOccupy);
        nodes.set_availability(self.target, CannotOccupy);
        self.needs_update = false;
        debug!(
            "Occupation cache reset, critical path has {} nodes",
            critical_path.len()
        );
    }

    /// Whether `point` can be occupied without disconnecting the start from the target. Cached
    /// answers are returned as is; [Undefined] cells are settled with a breadth-first probe and
    /// the verdict is cached.
    pub(crate) fn can_occupy(&mut self, nodes: &mut NodeMap, point: Point) -> bool {
        if point == self.start || point == self.target {
            return false;
        }
        let availability = match nodes.get(point) {
            Some(node) => node.occupation_availability,
            None => return false,
        };
        match availability {
            CanOccupy | CannotOccupy => {
                self.needs_update = false;
                availability == CanOccupy
            }
            Undefined => {
                let connected = self.probe(nodes, point);
                let verdict = if connected { CanOccupy } else { CannotOccupy };
                nodes.set_availability(point, verdict);
                self.needs_update = connected;
                connected
            }
        }
    }

    /// Searches from the target for the start with `point` temporarily blocked.
    fn probe(&mut self, nodes: &mut NodeMap, point: Point) -> bool {
        self.probe_count += 1;
        let previous = match nodes.get_mut(point) {
            Some(node) => std::mem::replace(&mut node.occupied, true),
            None => return false,
        };

        let mut visited = BoolGrid::new(nodes.width, nodes.height, false);
        let mut queue = VecDeque::new();
        visited.set_point(self.target, true);
        queue.push_back(self.target);
        let mut found = false;
        while let Some(current) = queue.pop_front() {
            if current == self.start {
                found = true;
                break;
            }
            for (neighbour, _) in nodes.neighborhood_points_and_cost(current) {
                if !visited.get_point(neighbour) {
                    visited.set_point(neighbour, true);
                    queue.push_back(neighbour);
                }
            }
        }

        if let Some(node) = nodes.get_mut(point) {
            node.occupied = previous;
        }
        trace!("Probe of {}: start reachable = {}", point, found);
        found
    }
}

fn is_diagonal(a: Point, b: Point) -> bool {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy == 2
}
