//! Error types for configuration, position queries and collaborators.

use thiserror::Error;

use crate::grid::Position;

/// Which kind of entity a placement or validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Predator,
    Prey,
    Obstacle,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Predator => "predator",
            EntityKind::Prey => "prey",
            EntityKind::Obstacle => "obstacle",
        };
        f.write_str(name)
    }
}

/// A run cannot be built from the requested configuration.
///
/// Always returned before any state is mutated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("grid size {0} is outside 1..={}", crate::config::MAX_GRID_SIZE)]
    InvalidGridSize(u32),

    #[error("obstacle density {0} must be a finite value in [0, 1]")]
    InvalidDensity(f64),

    #[error("event log capacity must be at least 1")]
    InvalidLogCapacity,

    #[error("not enough free cells for {entity}: need {needed}, only {available} available")]
    InsufficientSpace {
        entity: EntityKind,
        needed: usize,
        available: usize,
    },

    #[error("gave up placing {entity} after {attempts} attempts")]
    PlacementExhausted { entity: EntityKind, attempts: usize },

    #[error("{entity} at {position} is outside the grid")]
    OutOfBounds {
        entity: EntityKind,
        position: Position,
    },

    #[error("cell {position} is occupied more than once")]
    Overlap { position: Position },

    #[error("{declared} prey declared but {actual} positions supplied")]
    CountMismatch { declared: usize, actual: usize },

    #[error("unsupported search algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// A path or movement query was given a coordinate off the grid.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("position {position} is outside a {grid_size}x{grid_size} grid")]
pub struct InvalidPositionError {
    pub position: Position,
    pub grid_size: u32,
}

/// A configuration generator or path explainer failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator returned malformed output: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(e: serde_json::Error) -> Self {
        CollaboratorError::Malformed(e.to_string())
    }
}
