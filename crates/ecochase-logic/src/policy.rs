//! Agent movement policies.
//!
//! Policies never touch the world state; they take read-only snapshots and
//! return a proposed next position that the simulation loop applies.
//!
//! - **Prey**: uniform random step to a walkable, unoccupied neighbor, or
//!   stay put when boxed in.
//! - **Predator**: chase the nearest prey (Manhattan distance, lowest id on
//!   ties) one cell along the configured shortest path.

use rand::Rng;

use crate::config::SearchAlgorithm;
use crate::error::InvalidPositionError;
use crate::grid::{manhattan, Grid, Position};
use crate::pathfinding::find_path;
use crate::state::Prey;

/// Pick the next cell for a prey at `pos`.
///
/// `occupied` lists cells the prey may not enter this tick (the predator,
/// plus anything else the caller wants blocked).
pub fn prey_step<R: Rng + ?Sized>(
    pos: Position,
    grid: &Grid,
    occupied: &[Position],
    rng: &mut R,
) -> Position {
    let candidates: Vec<Position> = grid
        .neighbors4(pos)
        .into_iter()
        .filter(|c| !occupied.contains(c))
        .collect();
    if candidates.is_empty() {
        pos
    } else {
        candidates[rng.gen_range(0..candidates.len())]
    }
}

/// The prey closest to `predator`, lowest id first on ties.
pub fn select_target(predator: Position, prey: &[Prey]) -> Option<Prey> {
    prey.iter()
        .min_by_key(|p| (manhattan(predator, p.position), p.id))
        .copied()
}

/// What the predator decided this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredatorMove {
    /// Step to `next`, the first cell of `path`.
    Step { next: Position, path: Vec<Position> },
    /// Already on the target cell.
    OnTarget,
    /// No path to the target exists.
    Unreachable,
}

impl PredatorMove {
    /// Position after applying this move from `from`.
    pub fn destination(&self, from: Position) -> Position {
        match self {
            PredatorMove::Step { next, .. } => *next,
            PredatorMove::OnTarget | PredatorMove::Unreachable => from,
        }
    }

    pub fn path(&self) -> &[Position] {
        match self {
            PredatorMove::Step { path, .. } => path,
            PredatorMove::OnTarget | PredatorMove::Unreachable => &[],
        }
    }
}

/// One step toward `target` along the configured algorithm's path.
pub fn predator_step(
    predator: Position,
    target: Position,
    grid: &Grid,
    algorithm: SearchAlgorithm,
) -> Result<PredatorMove, InvalidPositionError> {
    if predator == target {
        grid.check_position(predator)?;
        return Ok(PredatorMove::OnTarget);
    }
    let path = find_path(algorithm, predator, target, grid)?;
    Ok(match path.first() {
        Some(&next) => PredatorMove::Step { next, path },
        None => PredatorMove::Unreachable,
    })
}
