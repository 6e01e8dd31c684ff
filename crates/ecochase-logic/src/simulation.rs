//! The tick state machine.
//!
//! ```text
//! idle ──start──▶ running ◀──▶ paused
//!                    │
//!                    └── prey set empty ──▶ finished (terminal)
//! ```
//!
//! One tick, strictly ordered:
//!
//! 1. No prey left → `finished`, log, return.
//! 2. Every prey steps against the pre-tick snapshot (RNG drawn in id order).
//! 3. The predator picks the nearest post-move prey and steps once along
//!    its path.
//! 4. Reward: `-1` time cost, `+1` if the predator got strictly closer to
//!    its target, `+50` per prey on the predator's new cell (removed).
//! 5. Tick counter advances. With [`FinishPolicy::NextTick`] an emptied
//!    prey set is only declared finished on the following evaluation.
//!
//! ```
//! use ecochase_logic::config::SimConfig;
//! use ecochase_logic::rng::create_rng;
//! use ecochase_logic::simulation::{set_phase, tick};
//! use ecochase_logic::state::Phase;
//! use ecochase_logic::world::initialize;
//!
//! let mut rng = create_rng(42);
//! let state = initialize(&SimConfig::default(), &mut rng).unwrap();
//! let state = tick(set_phase(state, Phase::Running), &mut rng);
//! assert_eq!(state.tick_count(), 1);
//! ```

use log::{debug, info, warn};
use rand::Rng;

use crate::config::{FinishPolicy, SimConfig};
use crate::error::ConfigurationError;
use crate::grid::manhattan;
use crate::policy::{predator_step, prey_step, select_target, PredatorMove};
use crate::state::{Phase, SimulationState};
use crate::world::initialize;

/// Reward subtracted every tick.
pub const TIME_PENALTY: i64 = 1;
/// Reward for strictly closing distance on the target.
pub const APPROACH_REWARD: i64 = 1;
/// Reward per captured prey.
pub const CAPTURE_REWARD: i64 = 50;

pub const FINISHED_MESSAGE: &str = "all prey captured, simulation finished";

/// Advance the run by one tick. A no-op unless the phase is `Running`.
pub fn tick<R: Rng + ?Sized>(mut state: SimulationState, rng: &mut R) -> SimulationState {
    advance(&mut state, rng);
    state
}

/// In-place form of [`tick`].
pub(crate) fn advance<R: Rng + ?Sized>(state: &mut SimulationState, rng: &mut R) {
    if state.phase != Phase::Running {
        return;
    }

    if state.prey.is_empty() {
        let now = state.tick;
        finish(state, now);
        return;
    }

    let tick = state.tick + 1;
    let predator = state.predator;

    // Prey decide against the pre-tick world only.
    let blocked = [predator];
    let moved: Vec<_> = state
        .prey
        .iter()
        .map(|p| prey_step(p.position, &state.grid, &blocked, rng))
        .collect();
    for (prey, position) in state.prey.iter_mut().zip(moved) {
        prey.position = position;
    }

    state.reward -= TIME_PENALTY;

    if let Some(target) = select_target(predator, &state.prey) {
        let mv = match predator_step(predator, target.position, &state.grid, state.algorithm) {
            Ok(mv) => mv,
            Err(e) => {
                warn!("tick {}: {}", tick, e);
                PredatorMove::Unreachable
            }
        };
        let next = mv.destination(predator);

        if manhattan(next, target.position) < manhattan(predator, target.position) {
            state.reward += APPROACH_REWARD;
        }
        if mv == PredatorMove::Unreachable {
            warn!(
                "tick {}: no path from {} to prey {} at {}",
                tick, predator, target.id, target.position
            );
            state.log.push(
                tick,
                format!(
                    "predator cannot find a path to prey {} at {}",
                    target.id, target.position
                ),
            );
        }

        state.last_path = mv.path().to_vec();
        state.path_origin = predator;
        state.target = Some(target.id);
        state.predator = next;
    } else {
        state.last_path.clear();
        state.path_origin = predator;
        state.target = None;
    }

    let at = state.predator;
    let mut captured = Vec::new();
    state.prey.retain(|p| {
        if p.position == at {
            captured.push(*p);
            false
        } else {
            true
        }
    });
    for prey in &captured {
        state.reward += CAPTURE_REWARD;
        info!("tick {}: captured prey {} at {}", tick, prey.id, prey.position);
        state.log.push(
            tick,
            format!("predator captured prey {} at {}", prey.id, prey.position),
        );
    }

    state.tick = tick;
    debug!(
        "tick {}: predator {}, {} prey left, reward {}",
        tick,
        state.predator,
        state.prey.len(),
        state.reward
    );

    if state.prey.is_empty() && state.finish_policy == FinishPolicy::Immediate {
        finish(state, tick);
    }
}

fn finish(state: &mut SimulationState, tick: u64) {
    state.phase = Phase::Finished;
    state.log.push(tick, FINISHED_MESSAGE);
    info!(
        "run finished after {} ticks with reward {}",
        state.tick, state.reward
    );
}

/// Request `Running` or `Paused`.
///
/// `Running` is accepted from `Idle` or `Paused`, `Paused` from `Running`.
/// Any other request, and any request on a finished run, leaves the state
/// unchanged.
pub fn set_phase(mut state: SimulationState, requested: Phase) -> SimulationState {
    apply_phase(&mut state, requested);
    state
}

pub(crate) fn apply_phase(state: &mut SimulationState, requested: Phase) -> bool {
    let allowed = matches!(
        (state.phase, requested),
        (Phase::Idle | Phase::Paused, Phase::Running) | (Phase::Running, Phase::Paused)
    );
    if allowed {
        debug!("phase {:?} -> {:?}", state.phase, requested);
        state.phase = requested;
    } else {
        debug!("ignored phase request {:?} while {:?}", requested, state.phase);
    }
    allowed
}

/// Discard `state` and build a fresh run from `config`.
///
/// On error the caller keeps its existing state.
pub fn reset<R: Rng + ?Sized>(
    state: &SimulationState,
    config: &SimConfig,
    rng: &mut R,
) -> Result<SimulationState, ConfigurationError> {
    let fresh = initialize(config, rng)?;
    info!("reset: discarded run at tick {}", state.tick);
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOptions;
    use crate::grid::Position;
    use crate::rng::create_rng;
    use crate::world::{from_layout, Layout};

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn running(layout: Layout, finish_policy: FinishPolicy) -> SimulationState {
        let options = RunOptions {
            finish_policy,
            ..RunOptions::default()
        };
        set_phase(from_layout(&layout, options).unwrap(), Phase::Running)
    }

    /// Prey in a dead-end pocket at the bottom-right corner: its only
    /// move is north, so the first tick is fully determined.
    fn pocket_prey(predator: Position) -> Layout {
        Layout {
            grid_size: 5,
            predator,
            prey: vec![p(4, 4)],
            obstacles: vec![p(3, 4)],
        }
    }

    #[test]
    fn test_tick_ignored_unless_running() {
        let state = from_layout(&pocket_prey(p(0, 0)), RunOptions::default()).unwrap();
        let mut rng = create_rng(1);
        let after = tick(state.clone(), &mut rng);
        assert_eq!(after, state);

        let paused = set_phase(set_phase(state, Phase::Running), Phase::Paused);
        let after = tick(paused.clone(), &mut rng);
        assert_eq!(after, paused);
    }

    #[test]
    fn test_approach_tick_nets_zero() {
        let mut rng = create_rng(1);
        let state = tick(running(pocket_prey(p(0, 0)), FinishPolicy::NextTick), &mut rng);
        assert_eq!(state.tick_count(), 1);
        assert_eq!(state.prey()[0].position, p(4, 3));
        assert_eq!(state.reward(), 0);
        assert_eq!(manhattan(state.predator(), p(0, 0)), 1);
        assert_eq!(state.target(), Some(0));
        assert_eq!(state.last_path().last(), Some(&p(4, 3)));
    }

    #[test]
    fn test_unreachable_tick_costs_one() {
        // Prey sealed into the corner: no exits, no path in.
        let sealed = Layout {
            grid_size: 5,
            predator: p(0, 0),
            prey: vec![p(4, 4)],
            obstacles: vec![p(4, 3), p(3, 4)],
        };
        let mut rng = create_rng(2);
        let state = tick(running(sealed, FinishPolicy::NextTick), &mut rng);
        assert_eq!(state.reward(), -1);
        assert_eq!(state.predator(), p(0, 0));
        assert!(state.last_path().is_empty());
        assert_eq!(
            state.log().last().unwrap().message,
            "predator cannot find a path to prey 0 at (4, 4)"
        );
    }

    #[test]
    fn test_capture_adds_bonus_and_removes_prey() {
        // Predator one step from the cornered prey.
        let layout = Layout {
            grid_size: 5,
            predator: p(4, 3),
            prey: vec![p(4, 4), p(0, 0)],
            obstacles: vec![p(3, 4), p(3, 3)],
        };
        let mut rng = create_rng(3);
        let state = tick(running(layout, FinishPolicy::NextTick), &mut rng);
        // Prey 0 cannot move: (4,3) is the predator, (3,4) an obstacle.
        assert_eq!(state.predator(), p(4, 4));
        assert_eq!(state.reward(), -TIME_PENALTY + APPROACH_REWARD + CAPTURE_REWARD);
        assert_eq!(state.prey().len(), 1);
        assert_eq!(state.prey()[0].id, 1);
        assert!(state
            .log()
            .iter()
            .any(|e| e.tick == 1 && e.message == "predator captured prey 0 at (4, 4)"));
    }

    #[test]
    fn test_finish_on_next_tick() {
        let layout = Layout {
            grid_size: 5,
            predator: p(4, 3),
            prey: vec![p(4, 4)],
            obstacles: vec![p(3, 4), p(3, 3)],
        };
        let mut rng = create_rng(4);
        let state = tick(running(layout, FinishPolicy::NextTick), &mut rng);
        assert!(state.prey().is_empty());
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.reward(), 50);

        let state = tick(state, &mut rng);
        assert_eq!(state.phase(), Phase::Finished);
        assert_eq!(state.tick_count(), 1);
        assert_eq!(state.reward(), 50);
        assert_eq!(state.log().last().unwrap().message, FINISHED_MESSAGE);

        // Terminal: further ticks and phase requests change nothing.
        let again = tick(state.clone(), &mut rng);
        assert_eq!(again, state);
        assert_eq!(set_phase(state.clone(), Phase::Running), state);
    }

    #[test]
    fn test_finish_immediate() {
        let layout = Layout {
            grid_size: 5,
            predator: p(4, 3),
            prey: vec![p(4, 4)],
            obstacles: vec![p(3, 4), p(3, 3)],
        };
        let mut rng = create_rng(4);
        let state = tick(running(layout, FinishPolicy::Immediate), &mut rng);
        assert_eq!(state.phase(), Phase::Finished);
        assert_eq!(state.tick_count(), 1);
        assert_eq!(state.reward(), 50);
    }

    #[test]
    fn test_zero_prey_finishes_on_first_tick() {
        let config = SimConfig {
            num_prey: 0,
            ..Default::default()
        };
        let mut rng = create_rng(8);
        let state = initialize(&config, &mut rng).unwrap();
        let state = tick(set_phase(state, Phase::Running), &mut rng);
        assert!(state.is_finished());
        assert_eq!(state.tick_count(), 0);
        assert_eq!(state.reward(), 0);
    }

    #[test]
    fn test_prey_never_enter_predator_or_obstacle() {
        let config = SimConfig {
            grid_size: 8,
            num_prey: 6,
            obstacle_density: 0.25,
            ..Default::default()
        };
        let mut rng = create_rng(21);
        let mut state = set_phase(initialize(&config, &mut rng).unwrap(), Phase::Running);
        for _ in 0..60 {
            let before = state.predator();
            state = tick(state, &mut rng);
            for prey in state.prey() {
                assert!(state.grid().is_walkable(prey.position));
                assert_ne!(prey.position, state.predator());
                assert_ne!(prey.position, before);
            }
            assert!(state.grid().is_walkable(state.predator()));
        }
    }

    #[test]
    fn test_predator_moves_at_most_one_cell() {
        let config = SimConfig {
            grid_size: 12,
            num_prey: 3,
            obstacle_density: 0.15,
            ..Default::default()
        };
        let mut rng = create_rng(6);
        let mut state = set_phase(initialize(&config, &mut rng).unwrap(), Phase::Running);
        for _ in 0..40 {
            let before = state.predator();
            state = tick(state, &mut rng);
            assert!(manhattan(before, state.predator()) <= 1);
        }
    }

    #[test]
    fn test_set_phase_transitions() {
        let state = from_layout(&pocket_prey(p(0, 0)), RunOptions::default()).unwrap();
        assert_eq!(set_phase(state.clone(), Phase::Paused).phase(), Phase::Idle);
        let state = set_phase(state, Phase::Running);
        assert_eq!(state.phase(), Phase::Running);
        let state = set_phase(state, Phase::Paused);
        assert_eq!(state.phase(), Phase::Paused);
        assert_eq!(set_phase(state.clone(), Phase::Finished).phase(), Phase::Paused);
        assert_eq!(set_phase(state, Phase::Running).phase(), Phase::Running);
    }

    #[test]
    fn test_reset_matches_fresh_initialize() {
        let config = SimConfig::default();
        let mut rng = create_rng(config.seed);
        let mut old = set_phase(initialize(&config, &mut rng).unwrap(), Phase::Running);
        for _ in 0..5 {
            old = tick(old, &mut rng);
        }

        let mut reset_rng = create_rng(config.seed);
        let from_reset = reset(&old, &config, &mut reset_rng).unwrap();
        let from_reset = tick(set_phase(from_reset, Phase::Running), &mut reset_rng);

        let mut fresh_rng = create_rng(config.seed);
        let fresh = initialize(&config, &mut fresh_rng).unwrap();
        let fresh = tick(set_phase(fresh, Phase::Running), &mut fresh_rng);

        assert_eq!(from_reset, fresh);
    }

    #[test]
    fn test_reset_error_keeps_nothing_applied() {
        let config = SimConfig {
            obstacle_density: 2.0,
            ..Default::default()
        };
        let state = from_layout(&pocket_prey(p(0, 0)), RunOptions::default()).unwrap();
        assert!(reset(&state, &config, &mut create_rng(1)).is_err());
    }
}
