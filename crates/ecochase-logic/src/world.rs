//! World initialization: random collision-free placement, or validation of
//! an explicitly supplied layout.
//!
//! # Placement Order
//!
//! 1. Predator at `(0, ⌊size/2⌋)`
//! 2. Prey `0..num_prey`, sampled from the right half of the grid
//!    (`x ∈ [⌊size/2⌋, size)`, `y ∈ [0, size)`)
//! 3. `⌊size² × density⌋` obstacles, sampled over the whole grid
//!
//! Each sample is rejected while it collides with an occupied cell. The
//! exact number of free cells is checked up front, so an over-full
//! configuration fails with [`ConfigurationError::InsufficientSpace`]
//! instead of spinning. Every rejection loop also has an attempt budget of
//! [`RETRY_FACTOR`] times the size of its sampling region.
//!
//! ```
//! use ecochase_logic::config::SimConfig;
//! use ecochase_logic::rng::create_rng;
//! use ecochase_logic::world::initialize;
//!
//! let config = SimConfig { grid_size: 10, num_prey: 2, obstacle_density: 0.1, ..Default::default() };
//! let state = initialize(&config, &mut create_rng(1)).unwrap();
//! assert_eq!(state.prey().len(), 2);
//! assert_eq!(state.obstacles().len(), 10);
//! ```

use std::collections::HashSet;

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{RunOptions, SimConfig, MAX_GRID_SIZE};
use crate::error::{ConfigurationError, EntityKind};
use crate::grid::{Grid, Position};
use crate::state::{Prey, SimulationState};

/// Attempts allowed per placement, as a multiple of the sampling region's
/// cell count.
pub const RETRY_FACTOR: usize = 64;

/// Explicit entity positions, as produced by a configuration generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub grid_size: u32,
    pub predator: Position,
    /// Prey positions; prey `i` gets id `i`.
    pub prey: Vec<Position>,
    pub obstacles: Vec<Position>,
}

/// Predator start cell for a grid of the given size.
pub fn predator_start(grid_size: u32) -> Position {
    Position::new(0, (grid_size / 2) as i32)
}

/// Build a fresh idle run by random placement.
pub fn initialize<R: Rng + ?Sized>(
    config: &SimConfig,
    rng: &mut R,
) -> Result<SimulationState, ConfigurationError> {
    config.validate()?;

    let size = config.grid_size;
    let half = size / 2;
    let predator = predator_start(size);
    let mut occupied: HashSet<Position> = HashSet::new();
    occupied.insert(predator);

    // Prey region: right half, x in [half, size).
    let prey_region = Region {
        x_min: half,
        size,
    };
    let prey_free = prey_region.cells() - prey_region.count_in(&occupied);
    if config.num_prey > prey_free {
        return Err(ConfigurationError::InsufficientSpace {
            entity: EntityKind::Prey,
            needed: config.num_prey,
            available: prey_free,
        });
    }

    let mut prey = Vec::with_capacity(config.num_prey);
    for id in 0..config.num_prey {
        let position = sample_free(rng, prey_region, &occupied, EntityKind::Prey)?;
        occupied.insert(position);
        prey.push(Prey {
            id: id as u32,
            position,
        });
    }

    let num_obstacles = config.obstacle_count();
    let full_region = Region { x_min: 0, size };
    let obstacle_free = full_region.cells() - occupied.len();
    if num_obstacles > obstacle_free {
        return Err(ConfigurationError::InsufficientSpace {
            entity: EntityKind::Obstacle,
            needed: num_obstacles,
            available: obstacle_free,
        });
    }

    let mut obstacles = Vec::with_capacity(num_obstacles);
    for _ in 0..num_obstacles {
        let position = sample_free(rng, full_region, &occupied, EntityKind::Obstacle)?;
        occupied.insert(position);
        obstacles.push(position);
    }

    info!(
        "initialized {}x{} grid: {} prey, {} obstacles, {}",
        size,
        size,
        prey.len(),
        obstacles.len(),
        config.algorithm
    );

    Ok(SimulationState::assemble(
        Grid::new(size, obstacles),
        predator,
        prey,
        config.run_options(),
        "initialized",
    ))
}

/// Build a fresh idle run from explicit positions.
///
/// Sampling is bypassed but the same invariants apply: every entity in
/// bounds and no two entities on one cell.
pub fn from_layout(
    layout: &Layout,
    options: RunOptions,
) -> Result<SimulationState, ConfigurationError> {
    if layout.grid_size == 0 || layout.grid_size > MAX_GRID_SIZE {
        return Err(ConfigurationError::InvalidGridSize(layout.grid_size));
    }
    if options.log_capacity == 0 {
        return Err(ConfigurationError::InvalidLogCapacity);
    }
    let grid = Grid::open(layout.grid_size);

    let entities = std::iter::once((EntityKind::Predator, layout.predator))
        .chain(layout.prey.iter().map(|&p| (EntityKind::Prey, p)))
        .chain(layout.obstacles.iter().map(|&p| (EntityKind::Obstacle, p)));

    let mut occupied = HashSet::new();
    for (entity, position) in entities {
        if !grid.in_bounds(position) {
            return Err(ConfigurationError::OutOfBounds { entity, position });
        }
        if !occupied.insert(position) {
            return Err(ConfigurationError::Overlap { position });
        }
    }

    let prey = layout
        .prey
        .iter()
        .enumerate()
        .map(|(id, &position)| Prey {
            id: id as u32,
            position,
        })
        .collect();

    debug!(
        "accepted explicit layout: {} prey, {} obstacles",
        layout.prey.len(),
        layout.obstacles.len()
    );

    Ok(SimulationState::assemble(
        Grid::new(layout.grid_size, layout.obstacles.iter().copied()),
        layout.predator,
        prey,
        options,
        "configuration generated",
    ))
}

/// Columns `x_min..size`, all rows.
#[derive(Debug, Clone, Copy)]
struct Region {
    x_min: u32,
    size: u32,
}

impl Region {
    fn cells(self) -> usize {
        (self.size - self.x_min) as usize * self.size as usize
    }

    fn contains(self, pos: Position) -> bool {
        pos.x >= self.x_min as i32
            && pos.x < self.size as i32
            && pos.y >= 0
            && pos.y < self.size as i32
    }

    fn count_in(self, occupied: &HashSet<Position>) -> usize {
        occupied.iter().filter(|&&p| self.contains(p)).count()
    }

    fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> Position {
        Position::new(
            rng.gen_range(self.x_min..self.size) as i32,
            rng.gen_range(0..self.size) as i32,
        )
    }
}

fn sample_free<R: Rng + ?Sized>(
    rng: &mut R,
    region: Region,
    occupied: &HashSet<Position>,
    entity: EntityKind,
) -> Result<Position, ConfigurationError> {
    let attempts = RETRY_FACTOR * region.cells();
    for _ in 0..attempts {
        let candidate = region.sample(rng);
        if !occupied.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(ConfigurationError::PlacementExhausted { entity, attempts })
}
