//! Run-time setup of a [Grid](crate::Grid).

use crate::error::{GridError, Result};
use grid_util::point::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dimensions and the two protected cells of a grid. Coordinates are `(x, y)` pairs so the
/// struct can be deserialized without depending on the point type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Cell the agents spawn at.
    pub start: (i32, i32),
    /// Cell every agent walks towards.
    pub target: (i32, i32),
}

impl Default for GridConfig {
    fn default() -> GridConfig {
        GridConfig {
            width: 10,
            height: 10,
            start: (0, 0),
            target: (9, 9),
        }
    }
}

impl GridConfig {
    pub fn new(width: usize, height: usize, start: Point, target: Point) -> GridConfig {
        GridConfig {
            width,
            height,
            start: (start.x, start.y),
            target: (target.x, target.y),
        }
    }
    pub fn start_point(&self) -> Point {
        Point::new(self.start.0, self.start.1)
    }
    pub fn target_point(&self) -> Point {
        Point::new(self.target.0, self.target.1)
    }
    fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }
    /// Checks the construction contract: a non-empty grid with distinct start and target
    /// inside it.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GridError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        // Indices are stored as i32 coordinates
        if i32::try_from(self.width).is_err() || i32::try_from(self.height).is_err() {
            return Err(GridError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        let start = self.start_point();
        let target = self.target_point();
        if !self.contains(start) {
            return Err(GridError::OutOfBounds {
                name: "start",
                point: start,
            });
        }
        if !self.contains(target) {
            return Err(GridError::OutOfBounds {
                name: "target",
                point: target,
            });
        }
        if start == target {
            return Err(GridError::CoincidentEndpoints(start));
        }
        Ok(())
    }
}
