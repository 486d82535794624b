use crate::config::GridConfig;
use crate::error::Result;
use crate::node::{Node, OccupationAvailability};
use crate::path_field::PathField;
use crate::{DIAGONAL_COST, N_SMALLVEC_SIZE, ORTHOGONAL_COST};
use core::fmt;
use grid_util::point::Point;
use log::{debug, info};
use petgraph::unionfind::UnionFind;
use smallvec::SmallVec;

/// Offsets of the Moore neighbourhood, clockwise starting north.
const MOORE_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Row-major storage of every [Node], together with the connectivity rule of the grid.
#[derive(Clone, Debug)]
pub(crate) struct NodeMap {
    pub(crate) width: usize,
    pub(crate) height: usize,
    nodes: Vec<Node>,
}

impl NodeMap {
    fn new(width: usize, height: usize) -> NodeMap {
        let mut nodes = Vec::with_capacity(width * height);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                nodes.push(Node::new(Point::new(x, y)));
            }
        }
        NodeMap {
            width,
            height,
            nodes,
        }
    }
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
    pub(crate) fn in_bounds(&self, pos: Point) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }
    pub(crate) fn index(&self, pos: Point) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width + pos.x as usize)
        } else {
            None
        }
    }
    pub(crate) fn get(&self, pos: Point) -> Option<&Node> {
        self.index(pos).map(|ix| &self.nodes[ix])
    }
    pub(crate) fn get_mut(&mut self, pos: Point) -> Option<&mut Node> {
        match self.index(pos) {
            Some(ix) => Some(&mut self.nodes[ix]),
            None => None,
        }
    }
    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }
    pub(crate) fn set_availability(&mut self, pos: Point, availability: OccupationAvailability) {
        if let Some(node) = self.get_mut(pos) {
            node.occupation_availability = availability;
        }
    }

    pub(crate) fn can_move_to_simple(&self, pos: Point) -> bool {
        self.get(pos).map_or(false, |node| !node.occupied)
    }
    /// Whether a single step from `start` to the adjacent cell `pos` is allowed. Diagonal steps
    /// additionally require both flanking corner cells to be free.
    pub(crate) fn can_move_to(&self, pos: Point, start: Point) -> bool {
        debug_assert!((start.x - pos.x).abs() <= 1 && (start.y - pos.y).abs() <= 1);
        self.can_move_to_simple(pos)
            && (start.x == pos.x
                || start.y == pos.y
                || (self.can_move_to_simple(Point::new(start.x, pos.y))
                    && self.can_move_to_simple(Point::new(pos.x, start.y))))
    }
    pub(crate) fn neighborhood_points_and_cost(
        &self,
        pos: Point,
    ) -> SmallVec<[(Point, f32); N_SMALLVEC_SIZE]> {
        MOORE_OFFSETS
            .iter()
            .map(|&(dx, dy)| Point::new(pos.x + dx, pos.y + dy))
            .filter(|p| self.can_move_to(*p, pos))
            .map(|p| {
                let cost = if p.x != pos.x && p.y != pos.y {
                    DIAGONAL_COST
                } else {
                    ORTHOGONAL_COST
                };
                (p, cost)
            })
            .collect()
    }
    /// Follows the `next_node` links starting at `from`. Yields `from` itself first and nothing
    /// if it is out of bounds.
    pub(crate) fn chain(&self, from: Point) -> impl Iterator<Item = Point> + '_ {
        std::iter::successors(self.get(from).map(Node::coords), move |p| {
            self.get(*p).and_then(Node::next_node)
        })
        .take(self.len())
    }
}

/// Outcome of [Grid::toggle].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    /// The point is not on the grid.
    Ignored,
    /// An obstacle was removed.
    Freed,
    /// An obstacle was placed.
    Occupied,
    /// Placing an obstacle here would cut the start off from the target.
    Refused,
}

/// A fixed-size grid of [Node]s together with the [PathField] that maintains the flow field
/// towards the target and decides where obstacles may be placed.
#[derive(Clone, Debug)]
pub struct Grid {
    nodes: NodeMap,
    start: Point,
    target: Point,
    field: PathField,
}

impl Grid {
    /// Creates an empty grid and computes the initial flow field.
    pub fn new(width: usize, height: usize, start: Point, target: Point) -> Result<Grid> {
        Grid::from_config(GridConfig::new(width, height, start, target))
    }
    pub fn from_config(config: GridConfig) -> Result<Grid> {
        config.validate()?;
        let start = config.start_point();
        let target = config.target_point();
        let mut grid = Grid {
            nodes: NodeMap::new(config.width, config.height),
            start,
            target,
            field: PathField::new(start, target),
        };
        info!(
            "Created {}x{} grid with start {} and target {}",
            config.width, config.height, start, target
        );
        grid.update_field();
        Ok(grid)
    }
    pub fn width(&self) -> usize {
        self.nodes.width
    }
    pub fn height(&self) -> usize {
        self.nodes.height
    }
    pub fn start(&self) -> Point {
        self.start
    }
    pub fn target(&self) -> Point {
        self.target
    }
    pub fn path_field(&self) -> &PathField {
        &self.field
    }
    pub fn in_bounds(&self, point: Point) -> bool {
        self.nodes.in_bounds(point)
    }

    /// Returns [None] outside of the grid.
    pub fn get_node(&self, point: Point) -> Option<&Node> {
        self.nodes.get(point)
    }
    /// Every node exactly once, in row-major order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }
    /// Free neighbours of `point` reachable in one step, with the cost of that step.
    pub fn neighbors(&self, point: Point) -> SmallVec<[(Point, f32); N_SMALLVEC_SIZE]> {
        if self.nodes.in_bounds(point) {
            self.nodes.neighborhood_points_and_cost(point)
        } else {
            SmallVec::new()
        }
    }

    /// Recomputes the flow field and resets the occupation cache.
    pub fn update_field(&mut self) {
        self.field.update_field(&mut self.nodes);
    }
    /// Recomputes the flow field only if the grid changed since the last computation. Returns
    /// whether a recompute happened.
    pub fn update(&mut self) -> bool {
        if self.field.needs_update() {
            info!("Field is dirty: recomputing");
            self.update_field();
            true
        } else {
            false
        }
    }
    /// Whether `point` can be blocked without disconnecting the start from the target.
    pub fn can_occupy(&mut self, point: Point) -> bool {
        self.field.can_occupy(&mut self.nodes, point)
    }

    /// Writes the occupancy of a cell without checking whether the start stays connected.
    /// Returns [false] for points outside the grid and for the start and target, which can
    /// never be occupied. The flow field is not recomputed; call [update](Self::update) or
    /// [update_field](Self::update_field) afterwards.
    pub fn set_occupied(&mut self, point: Point, occupied: bool) -> bool {
        if point == self.start || point == self.target {
            return false;
        }
        match self.nodes.get_mut(point) {
            Some(node) => {
                if node.occupied != occupied {
                    node.occupied = occupied;
                    self.field.request_update();
                }
                true
            }
            None => false,
        }
    }
    /// Frees an occupied cell or, if allowed, blocks a free one, recomputing the flow field
    /// whenever the grid changed.
    pub fn toggle(&mut self, point: Point) -> Toggle {
        let occupied = match self.nodes.get(point) {
            Some(node) => node.occupied,
            None => {
                debug!("Ignoring toggle of {} outside the grid", point);
                return Toggle::Ignored;
            }
        };
        if occupied {
            self.set_occupied(point, false);
            self.update_field();
            Toggle::Freed
        } else if self.can_occupy(point) {
            self.set_occupied(point, true);
            self.update_field();
            Toggle::Occupied
        } else {
            debug!("Refusing to occupy {}", point);
            Toggle::Refused
        }
    }

    /// The node an agent standing on `point` should walk to next.
    pub fn next_hop(&self, point: Point) -> Option<&Node> {
        self.get_node(point)
            .and_then(Node::next_node)
            .and_then(|next| self.get_node(next))
    }
    /// The cells visited when following the flow field from `point`, starting with `point`
    /// itself. The sequence ends at the target if it is reachable and is empty outside the grid.
    pub fn path_from(&self, point: Point) -> impl Iterator<Item = Point> + '_ {
        self.nodes.chain(point)
    }
    /// The walk from the start to the target along the flow field.
    pub fn critical_path(&self) -> Vec<Point> {
        self.path_from(self.start).collect()
    }

    /// Generates a [UnionFind] structure linking up free cells that can step onto each other.
    /// Indices are row-major, see [ix](Self::ix).
    pub fn components(&self) -> UnionFind<usize> {
        let mut components = UnionFind::new(self.nodes.len());
        for node in self.nodes.iter().filter(|n| !n.occupied) {
            let point = node.coords();
            let parent_ix = self.ix(point);
            // Only the forward half of the neighbourhood, the rest is covered from the other side
            [
                Point::new(point.x + 1, point.y),
                Point::new(point.x, point.y + 1),
                Point::new(point.x + 1, point.y + 1),
                Point::new(point.x + 1, point.y - 1),
            ]
            .into_iter()
            .filter(|p| self.nodes.can_move_to(*p, point))
            .for_each(|p| {
                components.union(parent_ix, self.ix(p));
            });
        }
        components
    }
    /// Checks whether `a` and `b` are free cells in the same connected component.
    pub fn reachable(&self, a: Point, b: Point) -> bool {
        if !self.nodes.can_move_to_simple(a) || !self.nodes.can_move_to_simple(b) {
            return false;
        }
        self.components().equiv(self.ix(a), self.ix(b))
    }
    /// Row-major index of an in-bounds point.
    pub fn ix(&self, point: Point) -> usize {
        debug_assert!(self.in_bounds(point));
        point.y as usize * self.nodes.width + point.x as usize
    }

    fn glyph(&self, node: &Node) -> char {
        let p = node.coords();
        if p == self.start {
            'S'
        } else if p == self.target {
            'T'
        } else if node.occupied {
            '#'
        } else {
            match node.next_node().map(|n| (n.x - p.x, n.y - p.y)) {
                Some((1, 0)) => '>',
                Some((-1, 0)) => '<',
                Some((0, 1)) => 'v',
                Some((0, -1)) => '^',
                Some((1, 1)) | Some((-1, -1)) => '\\',
                Some((1, -1)) | Some((-1, 1)) => '/',
                _ => '.',
            }
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Grid:")?;
        for y in 0..self.height() as i32 {
            let row = (0..self.width() as i32)
                .filter_map(|x| self.get_node(Point::new(x, y)))
                .map(|node| self.glyph(node))
                .collect::<String>();
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridError;
    use std::f32::consts::SQRT_2;

    #[test]
    fn construction_contract() {
        assert_eq!(
            Grid::new(0, 3, Point::new(0, 0), Point::new(1, 1)).unwrap_err(),
            GridError::EmptyGrid {
                width: 0,
                height: 3
            }
        );
        assert!(matches!(
            Grid::new(3, 3, Point::new(0, 3), Point::new(1, 1)),
            Err(GridError::OutOfBounds { name: "start", .. })
        ));
        assert_eq!(
            Grid::new(3, 3, Point::new(1, 1), Point::new(1, 1)).unwrap_err(),
            GridError::CoincidentEndpoints(Point::new(1, 1))
        );
        assert!(Grid::new(2, 1, Point::new(0, 0), Point::new(1, 0)).is_ok());
    }

    #[test]
    fn get_node_outside_is_absent() {
        let grid = Grid::new(4, 3, Point::new(0, 0), Point::new(3, 2)).unwrap();
        assert!(grid.get_node(Point::new(-1, 0)).is_none());
        assert!(grid.get_node(Point::new(4, 0)).is_none());
        assert!(grid.get_node(Point::new(0, 3)).is_none());
        assert_eq!(
            grid.get_node(Point::new(3, 2)).unwrap().coords(),
            Point::new(3, 2)
        );
    }

    #[test]
    fn all_nodes_row_major_and_unique() {
        let grid = Grid::new(4, 3, Point::new(0, 0), Point::new(3, 2)).unwrap();
        let coords = grid.all_nodes().map(Node::coords).collect::<Vec<_>>();
        assert_eq!(coords.len(), 12);
        assert_eq!(coords[0], Point::new(0, 0));
        assert_eq!(coords[1], Point::new(1, 0));
        assert_eq!(coords[4], Point::new(0, 1));
        for (ix, p) in coords.iter().enumerate() {
            assert_eq!(grid.ix(*p), ix);
        }
        // Restartable
        assert_eq!(grid.all_nodes().count(), 12);
    }

    #[test]
    fn neighbors_on_border() {
        let grid = Grid::new(5, 5, Point::new(0, 0), Point::new(4, 4)).unwrap();
        let mut corner = grid
            .neighbors(Point::new(0, 0))
            .into_iter()
            .map(|(p, _)| (p.x, p.y))
            .collect::<Vec<_>>();
        corner.sort();
        assert_eq!(corner, vec![(0, 1), (1, 0), (1, 1)]);
        assert_eq!(grid.neighbors(Point::new(2, 2)).len(), 8);
        assert!(grid.neighbors(Point::new(7, 7)).is_empty());
    }

    #[test]
    fn diagonal_costs() {
        let grid = Grid::new(3, 3, Point::new(0, 0), Point::new(2, 2)).unwrap();
        for (p, cost) in grid.neighbors(Point::new(1, 1)) {
            if p.x != 1 && p.y != 1 {
                assert_eq!(cost, SQRT_2);
            } else {
                assert_eq!(cost, 1.0);
            }
        }
    }

    /// Corresponds to the following grid, where the diagonal from (0, 0) to (1, 1) is cut
    /// by a single blocked corner:
    ///  ___
    /// |S# |
    /// |   |
    /// |  T|
    ///  ___
    #[test]
    fn no_corner_cutting() {
        let mut grid = Grid::new(3, 3, Point::new(0, 0), Point::new(2, 2)).unwrap();
        let diagonal = |grid: &Grid| {
            grid.neighbors(Point::new(0, 0))
                .iter()
                .any(|(p, _)| *p == Point::new(1, 1))
        };
        assert!(diagonal(&grid));
        grid.set_occupied(Point::new(1, 0), true);
        assert!(!diagonal(&grid));
        grid.set_occupied(Point::new(1, 0), false);
        grid.set_occupied(Point::new(0, 1), true);
        assert!(!diagonal(&grid));
        assert!(!grid
            .neighbors(Point::new(1, 1))
            .iter()
            .any(|(p, _)| *p == Point::new(0, 0)));
    }

    #[test]
    fn protected_cells_cannot_be_set() {
        let mut grid = Grid::new(3, 3, Point::new(0, 0), Point::new(2, 2)).unwrap();
        assert!(!grid.set_occupied(Point::new(0, 0), true));
        assert!(!grid.set_occupied(Point::new(2, 2), true));
        assert!(!grid.set_occupied(Point::new(3, 0), true));
        assert!(!grid.get_node(Point::new(0, 0)).unwrap().is_occupied());
        assert!(!grid.path_field().needs_update());
        assert!(grid.set_occupied(Point::new(1, 0), true));
        assert!(grid.path_field().needs_update());
    }

    /// Tests whether cells are mapped to the expected connected components.
    #[test]
    fn test_component_generation() {
        // |S#  |
        // | #  |
        // | # T|
        let mut grid = Grid::new(4, 3, Point::new(0, 0), Point::new(3, 2)).unwrap();
        for y in 0..3 {
            grid.set_occupied(Point::new(1, y), true);
        }
        let components = grid.components();
        let ix = |x, y| grid.ix(Point::new(x, y));
        assert!(components.equiv(ix(0, 0), ix(0, 2)));
        assert!(components.equiv(ix(2, 0), ix(3, 2)));
        assert!(!components.equiv(ix(0, 0), ix(2, 0)));
        assert!(!grid.reachable(Point::new(0, 0), Point::new(3, 2)));
        assert!(!grid.reachable(Point::new(0, 0), Point::new(1, 1)));
    }

    /// Two free cells touching only diagonally between two walls are not connected.
    #[test]
    fn components_respect_corners() {
        //  __
        // |S#|
        // |#T|
        //  __
        let mut grid = Grid::new(2, 2, Point::new(0, 0), Point::new(1, 1)).unwrap();
        assert!(grid.reachable(Point::new(0, 0), Point::new(1, 1)));
        grid.set_occupied(Point::new(1, 0), true);
        assert!(grid.reachable(Point::new(0, 0), Point::new(1, 1)));
        grid.set_occupied(Point::new(0, 1), true);
        assert!(!grid.reachable(Point::new(0, 0), Point::new(1, 1)));
    }

    #[test]
    fn toggle_outside_is_ignored() {
        let mut grid = Grid::new(3, 3, Point::new(0, 0), Point::new(2, 2)).unwrap();
        assert_eq!(grid.toggle(Point::new(-1, 1)), Toggle::Ignored);
        assert_eq!(grid.toggle(Point::new(0, 0)), Toggle::Refused);
        assert_eq!(grid.toggle(Point::new(2, 2)), Toggle::Refused);
    }

    #[test]
    fn toggle_places_and_frees() {
        let mut grid = Grid::new(5, 5, Point::new(0, 0), Point::new(4, 4)).unwrap();
        let p = Point::new(0, 4);
        assert_eq!(grid.toggle(p), Toggle::Occupied);
        assert!(grid.get_node(p).unwrap().is_occupied());
        assert!(!grid.get_node(p).unwrap().is_reachable());
        assert_eq!(grid.toggle(p), Toggle::Freed);
        assert!(!grid.get_node(p).unwrap().is_occupied());
        assert!(grid.get_node(p).unwrap().is_reachable());
    }

    #[test]
    fn update_only_when_dirty() {
        let mut grid = Grid::new(4, 4, Point::new(0, 0), Point::new(3, 3)).unwrap();
        assert!(!grid.update());
        grid.set_occupied(Point::new(1, 1), true);
        assert!(grid.update());
        assert!(!grid.update());
        assert!(grid
            .critical_path()
            .iter()
            .all(|p| *p != Point::new(1, 1)));
    }

    #[test]
    fn path_from_follows_next_hops() {
        let grid = Grid::new(4, 1, Point::new(0, 0), Point::new(3, 0)).unwrap();
        let path = grid.path_from(Point::new(0, 0)).collect::<Vec<_>>();
        assert_eq!(
            path,
            vec![
                Point::new(0, 0),
                Point::new(1, 0),
                Point::new(2, 0),
                Point::new(3, 0)
            ]
        );
        assert_eq!(
            grid.next_hop(Point::new(1, 0)).unwrap().coords(),
            Point::new(2, 0)
        );
        assert!(grid.next_hop(Point::new(3, 0)).is_none());
        assert_eq!(grid.path_from(Point::new(9, 0)).count(), 0);
        assert_eq!(grid.critical_path(), path);
    }

    #[test]
    fn display_shows_flow() {
        let mut grid = Grid::new(3, 2, Point::new(0, 0), Point::new(2, 0)).unwrap();
        grid.toggle(Point::new(1, 0));
        let text = grid.to_string();
        let rows = text.lines().collect::<Vec<_>>();
        assert_eq!(rows[0], "Grid:");
        assert_eq!(rows[1], "S#T");
        assert_eq!(rows[2].len(), 3);
        // The middle of the bottom row leads back up around the obstacle
        assert_eq!(rows[2].chars().nth(2), Some('^'));
    }
}
