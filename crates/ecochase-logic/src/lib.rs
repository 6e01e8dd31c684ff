//! Pure simulation logic for EcoChase.
//!
//! A predator chases prey across a square grid with obstacles. This crate
//! holds every rule of the run and nothing else: no rendering, no clock,
//! no I/O. Functions take plain data plus an explicit seeded RNG and return
//! results, so a run is fully reproducible from its configuration.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`collaborators`] | Config generator / path explainer payloads and offline implementations |
//! | [`config`] | Run configuration, search algorithm, finish policy |
//! | [`error`] | Configuration, position and collaborator errors |
//! | [`grid`] | Positions, bounds, walkability, 4-neighbor expansion |
//! | [`pathfinding`] | BFS and A* shortest paths |
//! | [`policy`] | Prey random walk, predator target selection and pursuit |
//! | [`rng`] | Seeded deterministic RNG |
//! | [`session`] | Host-facing run owner with epoch-tagged collaborator results |
//! | [`simulation`] | Tick state machine, rewards, phase control, reset |
//! | [`state`] | Simulation state, prey, bounded event log |
//! | [`world`] | Random and explicit world initialization |

pub mod collaborators;
pub mod config;
pub mod error;
pub mod grid;
pub mod pathfinding;
pub mod policy;
pub mod rng;
pub mod session;
pub mod simulation;
pub mod state;
pub mod world;

pub use config::{FinishPolicy, SearchAlgorithm, SimConfig};
pub use error::{CollaboratorError, ConfigurationError, InvalidPositionError};
pub use grid::{Grid, Position};
pub use session::Session;
pub use state::{Phase, SimulationState};
