//! The authoritative world state of a run and its bounded event log.
//!
//! A [`SimulationState`] is a plain value. It is built by the world
//! initializer, advanced by [`crate::simulation::tick`], and thrown away
//! wholesale on reset. Hosts read it through the accessors below.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::{FinishPolicy, RunOptions, SearchAlgorithm};
use crate::grid::{Grid, Position};

/// Run phase. `Finished` is terminal for the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

/// A live prey. Ids are assigned at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prey {
    pub id: u32,
    pub position: Position,
}

/// One event-log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub tick: u64,
    pub message: String,
}

/// Ring buffer of log entries. The oldest entries are evicted once
/// `capacity` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    total: u64,
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            total: 0,
        }
    }

    pub fn push(&mut self, tick: u64, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            tick,
            message: message.into(),
        });
        self.total += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries ever appended, including evicted ones.
    pub fn total_appended(&self) -> u64 {
        self.total
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }
}

/// Complete state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub(crate) grid: Grid,
    pub(crate) predator: Position,
    /// Live prey, ordered by id.
    pub(crate) prey: Vec<Prey>,
    pub(crate) tick: u64,
    pub(crate) reward: i64,
    pub(crate) log: EventLog,
    pub(crate) phase: Phase,
    pub(crate) algorithm: SearchAlgorithm,
    pub(crate) finish_policy: FinishPolicy,
    /// Path computed on the most recent tick, for rendering.
    pub(crate) last_path: Vec<Position>,
    /// Cell `last_path` was planned from.
    pub(crate) path_origin: Position,
    /// Prey the predator chased on the most recent tick.
    pub(crate) target: Option<u32>,
}

impl SimulationState {
    /// Assemble a fresh idle state. Callers are responsible for the
    /// placement invariants; see [`crate::world`].
    pub(crate) fn assemble(
        grid: Grid,
        predator: Position,
        mut prey: Vec<Prey>,
        options: RunOptions,
        first_message: &str,
    ) -> Self {
        prey.sort_by_key(|p| p.id);
        let mut log = EventLog::with_capacity(options.log_capacity);
        log.push(0, first_message);
        Self {
            grid,
            predator,
            prey,
            tick: 0,
            reward: 0,
            log,
            phase: Phase::Idle,
            algorithm: options.algorithm,
            finish_policy: options.finish_policy,
            last_path: Vec::new(),
            path_origin: predator,
            target: None,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_size(&self) -> u32 {
        self.grid.size()
    }

    pub fn predator(&self) -> Position {
        self.predator
    }

    pub fn prey(&self) -> &[Prey] {
        &self.prey
    }

    pub fn obstacles(&self) -> &BTreeSet<Position> {
        self.grid.obstacles()
    }

    pub fn last_path(&self) -> &[Position] {
        &self.last_path
    }

    pub fn path_origin(&self) -> Position {
        self.path_origin
    }

    /// Id of the prey targeted on the most recent tick.
    pub fn target(&self) -> Option<u32> {
        self.target
    }

    /// Current position of the most recent target, if it is still alive.
    pub fn target_position(&self) -> Option<Position> {
        let id = self.target?;
        self.prey.iter().find(|p| p.id == id).map(|p| p.position)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn reward(&self) -> i64 {
        self.reward
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn algorithm(&self) -> SearchAlgorithm {
        self.algorithm
    }

    pub fn finish_policy(&self) -> FinishPolicy {
        self.finish_policy
    }
}
