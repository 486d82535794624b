use grid_util::point::Point;

/// Cached answer to "can this cell be blocked without cutting the start off from the target".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OccupationAvailability {
    CanOccupy,
    CannotOccupy,
    /// Must be settled by a reachability probe before the cell may be blocked.
    Undefined,
}

/// A single cell of the [Grid](crate::Grid). Nodes are created once and live as long as the
/// grid; the flow field and the occupancy workflow update them in place.
#[derive(Clone, Debug)]
pub struct Node {
    coords: Point,
    pub(crate) occupied: bool,
    pub(crate) path_weight: f32,
    pub(crate) next_node: Option<Point>,
    pub(crate) occupation_availability: OccupationAvailability,
}

impl Node {
    pub(crate) fn new(coords: Point) -> Node {
        Node {
            coords,
            occupied: false,
            path_weight: f32::INFINITY,
            next_node: None,
            occupation_availability: OccupationAvailability::Undefined,
        }
    }
    pub fn coords(&self) -> Point {
        self.coords
    }
    pub fn is_occupied(&self) -> bool {
        self.occupied
    }
    /// Distance to the target along the flow field, [f32::INFINITY] if the target cannot be
    /// reached from here.
    pub fn path_weight(&self) -> f32 {
        self.path_weight
    }
    /// Coordinates of the neighbour to step to when heading for the target. [None] at the
    /// target itself and on unreachable cells.
    pub fn next_node(&self) -> Option<Point> {
        self.next_node
    }
    pub fn occupation_availability(&self) -> OccupationAvailability {
        self.occupation_availability
    }
    pub fn is_reachable(&self) -> bool {
        self.path_weight.is_finite()
    }
    /// Whether the hop to [next_node](Self::next_node) is diagonal.
    pub fn has_diagonal_edge(&self) -> bool {
        self.next_node.map_or(false, |next| {
            let dx = next.x - self.coords.x;
            let dy = next.y - self.coords.y;
            dx * dx + dy * dy == 2
        })
    }
    pub(crate) fn reset_weight(&mut self) {
        self.path_weight = f32::INFINITY;
        self.next_node = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_node_is_unreachable() {
        let node = Node::new(Point::new(2, 3));
        assert_eq!(node.coords(), Point::new(2, 3));
        assert!(!node.is_occupied());
        assert!(!node.is_reachable());
        assert_eq!(node.next_node(), None);
        assert_eq!(
            node.occupation_availability(),
            OccupationAvailability::Undefined
        );
    }

    #[test]
    fn diagonal_edge_detection() {
        let mut node = Node::new(Point::new(1, 1));
        assert!(!node.has_diagonal_edge());
        node.next_node = Some(Point::new(2, 1));
        assert!(!node.has_diagonal_edge());
        node.next_node = Some(Point::new(0, 2));
        assert!(node.has_diagonal_edge());
        node.reset_weight();
        assert!(!node.has_diagonal_edge());
        assert_eq!(node.path_weight(), f32::INFINITY);
    }
}
