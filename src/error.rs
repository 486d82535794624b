//! Errors raised when a [Grid](crate::Grid) cannot be constructed.

use grid_util::point::Point;
use thiserror::Error;

/// Construction-time contract violations. Lookups and searches never fail; an unreachable
/// cell is reported through its [path_weight](crate::Node::path_weight) instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("grid must have a positive size, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },

    #[error("{name} {point} lies outside the grid")]
    OutOfBounds { name: &'static str, point: Point },

    #[error("start and target must differ, both are {0}")]
    CoincidentEndpoints(Point),
}

pub type Result<T> = std::result::Result<T, GridError>;
