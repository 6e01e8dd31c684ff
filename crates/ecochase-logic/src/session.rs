//! Host-facing owner of a run.
//!
//! A [`Session`] holds the current [`SimulationState`], the seeded RNG that
//! drives it, the configuration it was built from, and a run epoch. The
//! epoch advances on every whole-state replacement (reset or an accepted
//! generated configuration). Collaborator calls are tagged with the epoch
//! at the time they were issued via a [`CollaboratorTicket`]; a result that
//! comes back after the epoch moved on is discarded.
//!
//! Ticks and resets both take `&mut self`, so a reset can never interleave
//! with a tick in progress.
//!
//! ```
//! use ecochase_logic::config::SimConfig;
//! use ecochase_logic::session::Session;
//!
//! let mut session = Session::new(SimConfig::default()).unwrap();
//! session.start();
//! session.step();
//! assert_eq!(session.state().tick_count(), 1);
//! ```

use log::{info, warn};

use crate::collaborators::{ExplanationRequest, GeneratedConfig};
use crate::config::SimConfig;
use crate::error::{CollaboratorError, ConfigurationError};
use crate::rng::{create_rng, SimRng};
use crate::simulation::{advance, apply_phase};
use crate::state::{Phase, SimulationState};
use crate::world::{from_layout, initialize};

/// Marks the run epoch a collaborator request was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollaboratorTicket {
    epoch: u64,
}

impl CollaboratorTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Result of offering a generated configuration to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The run was replaced wholesale.
    Applied,
    /// The session was reset after the request was issued; result dropped.
    Stale,
    /// The generator failed; the run is untouched.
    Failed(CollaboratorError),
    /// The generated layout broke a placement rule; the run is untouched.
    Rejected(ConfigurationError),
}

pub struct Session {
    config: SimConfig,
    state: SimulationState,
    rng: SimRng,
    epoch: u64,
}

impl Session {
    /// Build a session with a freshly initialized run.
    pub fn new(config: SimConfig) -> Result<Self, ConfigurationError> {
        let mut rng = create_rng(config.seed);
        let state = initialize(&config, &mut rng)?;
        Ok(Self {
            config,
            state,
            rng,
            epoch: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Request the running phase. Returns whether it was accepted.
    pub fn start(&mut self) -> bool {
        apply_phase(&mut self.state, Phase::Running)
    }

    /// Request the paused phase. Returns whether it was accepted.
    pub fn pause(&mut self) -> bool {
        apply_phase(&mut self.state, Phase::Paused)
    }

    /// Evaluate one tick.
    pub fn step(&mut self) -> &SimulationState {
        advance(&mut self.state, &mut self.rng);
        &self.state
    }

    /// Evaluate ticks until the run stops running or `max_ticks`
    /// evaluations have happened. Returns the number of evaluations.
    pub fn run(&mut self, max_ticks: u64) -> u64 {
        let mut evaluated = 0;
        while evaluated < max_ticks && self.state.phase() == Phase::Running {
            advance(&mut self.state, &mut self.rng);
            evaluated += 1;
        }
        evaluated
    }

    /// Replace the run with a fresh one built from `config`.
    ///
    /// The RNG is re-seeded from `config.seed`, so a reset session replays
    /// exactly like a new one. On error nothing changes.
    pub fn reset(&mut self, config: SimConfig) -> Result<(), ConfigurationError> {
        let mut rng = create_rng(config.seed);
        let state = initialize(&config, &mut rng)?;
        info!(
            "session reset at tick {} (epoch {} -> {})",
            self.state.tick_count(),
            self.epoch,
            self.epoch + 1
        );
        self.replace(config, state, rng);
        Ok(())
    }

    /// Ticket for a collaborator call issued now.
    pub fn ticket(&self) -> CollaboratorTicket {
        CollaboratorTicket { epoch: self.epoch }
    }

    fn is_current(&self, ticket: CollaboratorTicket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Offer a configuration generator's result.
    pub fn apply_generated(
        &mut self,
        ticket: CollaboratorTicket,
        result: Result<GeneratedConfig, CollaboratorError>,
    ) -> ApplyOutcome {
        if !self.is_current(ticket) {
            info!(
                "discarding generated configuration from epoch {} (now {})",
                ticket.epoch, self.epoch
            );
            return ApplyOutcome::Stale;
        }
        let generated = match result {
            Ok(generated) => generated,
            Err(e) => {
                warn!("configuration generator failed: {}", e);
                return ApplyOutcome::Failed(e);
            }
        };
        let config = generated.merge_into(&self.config);
        let state = match generated
            .to_layout()
            .and_then(|layout| from_layout(&layout, config.run_options()))
        {
            Ok(state) => state,
            Err(e) => {
                warn!("rejected generated configuration: {}", e);
                return ApplyOutcome::Rejected(e);
            }
        };
        let rng = create_rng(config.seed);
        info!(
            "applied generated {}x{} configuration with {} prey",
            config.grid_size, config.grid_size, config.num_prey
        );
        self.replace(config, state, rng);
        ApplyOutcome::Applied
    }

    /// Snapshot of the most recent path for a path explainer, if the
    /// predator has chased anything yet.
    pub fn explanation_request(&self) -> Option<ExplanationRequest> {
        let state = &self.state;
        state.target()?;
        let prey_position = state
            .target_position()
            .or_else(|| state.last_path().last().copied())?;
        Some(ExplanationRequest {
            grid_size: state.grid_size(),
            predator_position: state.path_origin(),
            prey_position,
            obstacle_positions: state.obstacles().iter().copied().collect(),
            search_algorithm: state.algorithm(),
            path: state.last_path().to_vec(),
        })
    }

    /// Accept a path explainer's result. Stale or failed results yield
    /// `None`; neither affects the run.
    pub fn accept_explanation(
        &self,
        ticket: CollaboratorTicket,
        result: Result<String, CollaboratorError>,
    ) -> Option<String> {
        if !self.is_current(ticket) {
            info!("discarding explanation from epoch {}", ticket.epoch);
            return None;
        }
        match result {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("path explainer failed: {}", e);
                None
            }
        }
    }

    fn replace(&mut self, config: SimConfig, state: SimulationState, rng: SimRng) {
        self.config = config;
        self.state = state;
        self.rng = rng;
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{
        ConfigGenerator, PathExplainer, PromptConfigGenerator, TemplateExplainer,
    };
    use crate::grid::Position;

    fn small() -> SimConfig {
        SimConfig {
            grid_size: 10,
            num_prey: 2,
            obstacle_density: 0.1,
            seed: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_start_pause_step() {
        let mut session = Session::new(small()).unwrap();
        session.step();
        assert_eq!(session.state().tick_count(), 0);
        assert!(session.start());
        session.step();
        assert_eq!(session.state().tick_count(), 1);
        assert!(session.pause());
        session.step();
        assert_eq!(session.state().tick_count(), 1);
        assert!(!session.pause());
    }

    #[test]
    fn test_run_stops_at_finish() {
        let mut session = Session::new(SimConfig {
            num_prey: 0,
            ..small()
        })
        .unwrap();
        session.start();
        assert_eq!(session.run(100), 1);
        assert!(session.state().is_finished());
    }

    #[test]
    fn test_run_respects_limit() {
        let mut session = Session::new(small()).unwrap();
        session.start();
        let evaluated = session.run(3);
        assert!(evaluated <= 3);
        assert!(session.state().tick_count() <= 3);
    }

    #[test]
    fn test_reset_replays_identically() {
        let mut a = Session::new(small()).unwrap();
        a.start();
        a.run(10);
        a.reset(small()).unwrap();
        a.start();
        a.run(10);

        let mut b = Session::new(small()).unwrap();
        b.start();
        b.run(10);

        assert_eq!(a.state(), b.state());
        assert_eq!(a.epoch(), 1);
    }

    #[test]
    fn test_reset_error_leaves_session() {
        let mut session = Session::new(small()).unwrap();
        let before = session.state().clone();
        let bad = SimConfig {
            obstacle_density: 1.0,
            ..small()
        };
        assert!(session.reset(bad).is_err());
        assert_eq!(session.state(), &before);
        assert_eq!(session.epoch(), 0);
    }

    #[test]
    fn test_apply_generated() {
        let mut session = Session::new(small()).unwrap();
        let ticket = session.ticket();
        let generated = PromptConfigGenerator::new(2).generate("15x15 4 prey sparse");
        assert_eq!(session.apply_generated(ticket, generated), ApplyOutcome::Applied);
        assert_eq!(session.state().grid_size(), 15);
        assert_eq!(session.state().prey().len(), 4);
        assert_eq!(session.config().algorithm, small().algorithm);
        assert_eq!(session.epoch(), 1);
    }

    #[test]
    fn test_stale_generation_discarded() {
        let mut session = Session::new(small()).unwrap();
        let ticket = session.ticket();
        session.reset(small()).unwrap();
        let generated = PromptConfigGenerator::new(2).generate("15x15");
        assert_eq!(session.apply_generated(ticket, generated), ApplyOutcome::Stale);
        assert_eq!(session.state().grid_size(), 10);
    }

    #[test]
    fn test_failed_generation_keeps_state() {
        let mut session = Session::new(small()).unwrap();
        session.start();
        session.run(2);
        let before = session.state().clone();
        let ticket = session.ticket();
        let outcome = session.apply_generated(
            ticket,
            Err(CollaboratorError::Unavailable("timeout".into())),
        );
        assert!(matches!(outcome, ApplyOutcome::Failed(_)));
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn test_invalid_generation_rejected() {
        let mut session = Session::new(small()).unwrap();
        let ticket = session.ticket();
        let generated = GeneratedConfig {
            grid_size: 5,
            num_prey: 1,
            obstacle_density: 0.0,
            predator_initial_position: Position::new(0, 2),
            prey_initial_positions: vec![Position::new(0, 2)],
            obstacle_positions: vec![],
        };
        let outcome = session.apply_generated(ticket, Ok(generated));
        assert_eq!(
            outcome,
            ApplyOutcome::Rejected(ConfigurationError::Overlap {
                position: Position::new(0, 2),
            })
        );
        assert_eq!(session.state().grid_size(), 10);
        assert_eq!(session.epoch(), 0);
    }

    #[test]
    fn test_explanation_flow() {
        let mut session = Session::new(small()).unwrap();
        assert!(session.explanation_request().is_none());
        session.start();
        session.step();
        let request = session.explanation_request().unwrap();
        assert_eq!(request.grid_size, 10);
        assert_eq!(request.path, session.state().last_path());
        assert_eq!(request.predator_position, session.state().path_origin());

        let ticket = session.ticket();
        let text = session.accept_explanation(ticket, TemplateExplainer.explain(&request));
        assert!(text.is_some());

        session.reset(small()).unwrap();
        assert!(session
            .accept_explanation(ticket, Ok("late".into()))
            .is_none());
    }

    #[test]
    fn test_failed_explanation_is_dropped() {
        let session = Session::new(small()).unwrap();
        let ticket = session.ticket();
        let result = Err(CollaboratorError::Malformed("no text".into()));
        assert!(session.accept_explanation(ticket, result).is_none());
    }
}
