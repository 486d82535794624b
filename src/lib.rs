//! # flow_field_grid
//!
//! Flow field pathfinding on a fixed-size grid, as used by tower-defense style games where
//! many agents walk from a common start to a common target while obstacles are placed and
//! removed. A single [Dijkstra](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm) pass from
//! the target gives every cell a pointer to the neighbour it should step to next. Moves are
//! 8-directional, but a diagonal step is only allowed when neither of the two cells it cuts
//! past is blocked.
//!
//! Obstacles may never cut the start off from the target. Whether a cell can be blocked is
//! cached per node: only cells on the current start-target walk, and the corners of its
//! diagonal hops, need a breadth-first probe before they can be blocked.
//!
//! ```
//! use flow_field_grid::{Grid, Toggle};
//! use grid_util::point::Point;
//!
//! let mut grid = Grid::new(5, 5, Point::new(0, 0), Point::new(4, 4)).unwrap();
//! assert_eq!(grid.toggle(Point::new(2, 2)), Toggle::Occupied);
//! assert!(!grid.critical_path().contains(&Point::new(2, 2)));
//! ```
mod config;
mod error;
mod grid;
mod node;
mod path_field;

pub use crate::config::GridConfig;
pub use crate::error::{GridError, Result};
pub use crate::grid::{Grid, Toggle};
pub use crate::node::{Node, OccupationAvailability};
pub use crate::path_field::PathField;

/// Cost of a cardinal (straight) step.
pub const ORTHOGONAL_COST: f32 = 1.0;
/// Cost of a diagonal step.
pub const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;
/// Inline capacity of neighbour lists, enough for a full Moore neighbourhood.
pub const N_SMALLVEC_SIZE: usize = 8;
