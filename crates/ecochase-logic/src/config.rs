//! Run configuration and validation.
//!
//! A [`SimConfig`] fully determines a run: grid size, prey count, obstacle
//! density, the predator's search algorithm, when a run is declared
//! finished, and the RNG seed. Unknown fields are rejected and missing
//! fields fall back to [`SimConfig::default`].
//!
//! ```
//! use ecochase_logic::config::{SearchAlgorithm, SimConfig};
//!
//! let config: SimConfig = serde_json::from_str(r#"{"grid_size": 10, "algorithm": "BFS"}"#).unwrap();
//! assert_eq!(config.grid_size, 10);
//! assert_eq!(config.algorithm, SearchAlgorithm::Bfs);
//! assert_eq!(config.num_prey, 3);
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Largest accepted grid side length.
pub const MAX_GRID_SIZE: u32 = 256;

/// Default bound on retained event-log entries.
pub const DEFAULT_LOG_CAPACITY: usize = 256;

/// Search algorithm used by the predator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAlgorithm {
    #[serde(alias = "BFS")]
    Bfs,
    #[default]
    #[serde(alias = "A*", alias = "astar")]
    AStar,
}

impl SearchAlgorithm {
    pub fn label(self) -> &'static str {
        match self {
            SearchAlgorithm::Bfs => "BFS",
            SearchAlgorithm::AStar => "A*",
        }
    }
}

impl fmt::Display for SearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SearchAlgorithm {
    type Err = ConfigurationError;

    /// Accepts `bfs`, `a*`, `astar` and `a_star` in any case. Learning-based
    /// agents (PPO, SAC) are not supported.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bfs" => Ok(SearchAlgorithm::Bfs),
            "a*" | "astar" | "a_star" => Ok(SearchAlgorithm::AStar),
            _ => Err(ConfigurationError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// When a run that has just lost its last prey is marked finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishPolicy {
    /// The capturing tick completes normally; the next tick evaluation
    /// declares the run finished.
    #[default]
    NextTick,
    /// The capturing tick itself transitions to finished.
    Immediate,
}

/// Full configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Side length of the square grid.
    pub grid_size: u32,
    /// Number of prey placed at initialization.
    pub num_prey: usize,
    /// Fraction of all cells turned into obstacles (0.0–1.0).
    pub obstacle_density: f64,
    /// Predator search algorithm.
    pub algorithm: SearchAlgorithm,
    pub finish_policy: FinishPolicy,
    /// Seed for placement and prey movement.
    pub seed: u64,
    /// Maximum retained event-log entries.
    pub log_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: 20,
            num_prey: 3,
            obstacle_density: 0.2,
            algorithm: SearchAlgorithm::AStar,
            finish_policy: FinishPolicy::NextTick,
            seed: 42,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl SimConfig {
    /// Check the parameters that do not depend on random placement.
    ///
    /// Whether the entities actually fit is decided by the initializer.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.grid_size == 0 || self.grid_size > MAX_GRID_SIZE {
            return Err(ConfigurationError::InvalidGridSize(self.grid_size));
        }
        if !self.obstacle_density.is_finite() || !(0.0..=1.0).contains(&self.obstacle_density) {
            return Err(ConfigurationError::InvalidDensity(self.obstacle_density));
        }
        if self.log_capacity == 0 {
            return Err(ConfigurationError::InvalidLogCapacity);
        }
        Ok(())
    }

    /// Obstacle count implied by the density: ⌊size² × density⌋.
    pub fn obstacle_count(&self) -> usize {
        let cells = self.grid_size as f64 * self.grid_size as f64;
        (cells * self.obstacle_density).floor() as usize
    }

    /// Options that carry over into a run built from an explicit layout.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            algorithm: self.algorithm,
            finish_policy: self.finish_policy,
            log_capacity: self.log_capacity,
        }
    }
}

/// The subset of [`SimConfig`] that governs a run once entities are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub algorithm: SearchAlgorithm,
    pub finish_policy: FinishPolicy,
    pub log_capacity: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        SimConfig::default().run_options()
    }
}
