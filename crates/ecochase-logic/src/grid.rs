//! Bounded 4-connected grid with static obstacles.
//!
//! The grid is immutable for the lifetime of a run. Every query here is a
//! pure function of the grid data, shared by the initializer, the path
//! finder and the agent policies.
//!
//! # Neighbor Order
//!
//! | Index | Direction | Offset |
//! |-------|-----------|--------|
//! | 0 | South | (0, +1) |
//! | 1 | North | (0, -1) |
//! | 2 | East | (+1, 0) |
//! | 3 | West | (-1, 0) |
//!
//! Both search algorithms break ties by this order, so it is fixed.
//!
//! ```
//! use ecochase_logic::grid::{Grid, Position};
//!
//! let grid = Grid::new(3, [Position::new(1, 0)]);
//! assert!(!grid.is_walkable(Position::new(1, 0)));
//! assert_eq!(grid.neighbors4(Position::new(0, 0)), vec![Position::new(0, 1)]);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidPositionError;

/// A cell coordinate. Signed so neighbor offsets can step off the grid
/// before the bounds check rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset this position by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned neighbor offsets in search order: South, North, East, West.
pub const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Manhattan distance |dx| + |dy|.
pub fn manhattan(a: Position, b: Position) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// Square grid of `size × size` cells with a fixed obstacle set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: u32,
    obstacles: BTreeSet<Position>,
}

impl Grid {
    pub fn new(size: u32, obstacles: impl IntoIterator<Item = Position>) -> Self {
        Self {
            size,
            obstacles: obstacles.into_iter().collect(),
        }
    }

    /// Grid with no obstacles.
    pub fn open(size: u32) -> Self {
        Self::new(size, [])
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.size as usize * self.size as usize
    }

    pub fn obstacles(&self) -> &BTreeSet<Position> {
        &self.obstacles
    }

    pub fn is_obstacle(&self, pos: Position) -> bool {
        self.obstacles.contains(&pos)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        let size = i64::from(self.size);
        (0..size).contains(&i64::from(pos.x)) && (0..size).contains(&i64::from(pos.y))
    }

    /// True iff `pos` is in bounds and not an obstacle cell.
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.in_bounds(pos) && !self.is_obstacle(pos)
    }

    /// Walkable axis-aligned neighbors of `pos`, in [`DIRECTIONS`] order.
    pub fn neighbors4(&self, pos: Position) -> Vec<Position> {
        DIRECTIONS
            .iter()
            .map(|&(dx, dy)| pos.offset(dx, dy))
            .filter(|&p| self.is_walkable(p))
            .collect()
    }

    /// Reject out-of-bounds coordinates before a search or movement query.
    pub fn check_position(&self, pos: Position) -> Result<(), InvalidPositionError> {
        if self.in_bounds(pos) {
            Ok(())
        } else {
            Err(InvalidPositionError {
                position: pos,
                grid_size: self.size,
            })
        }
    }
}

/// Free-function form of [`Grid::is_walkable`].
pub fn is_walkable(pos: Position, grid: &Grid) -> bool {
    grid.is_walkable(pos)
}

/// Free-function form of [`Grid::neighbors4`].
pub fn neighbors4(pos: Position, grid: &Grid) -> Vec<Position> {
    grid.neighbors4(pos)
}
