//! Round scheduler driving the fleet simulation.
//!
//! Each call to [`Simulation::step_round`] runs one synchronized round:
//!
//! 1. **STEP**: every active submarine with a pending command pulls and
//!    applies exactly one command, sequentially or on the rayon pool
//! 2. **BARRIER**: all steps finish before anything else happens; events
//!    for the step phase are emitted afterwards in fleet order
//! 3. **COLLIDE**: one collision pass over the active set, always on the
//!    calling thread; destroyed submarines lose their streams
//! 4. **REFRESH**: pending commands are primed; if no active submarine has
//!    one left, the scheduler terminates
//!
//! # Determinism
//!
//! Both scheduling models produce the same fleet state, collision log and
//! event stream: movement touches only the stepping submarine, and the
//! collision pass and event emission always run in fleet order.
//!
//! # Example
//!
//! ```
//! use subfleet_core::command::Command;
//! use subfleet_core::config::SimulationConfig;
//! use subfleet_core::simulation::Simulation;
//! use subfleet_core::stream::ScriptedSource;
//!
//! let source = ScriptedSource::new()
//!     .with_script("A", vec![Command::forward(5)])
//!     .with_script("B", vec![Command::forward(5)]);
//!
//! let mut sim = Simulation::from_source(&source, SimulationConfig::default());
//! let summary = sim.run();
//!
//! assert_eq!(summary.rounds, 1);
//! assert_eq!(summary.collisions.len(), 1);
//! assert!(summary.survivors.is_empty());
//! ```

use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::collision::{Collision, CollisionDetector};
use crate::config::{Scheduling, SimulationConfig};
use crate::entity::{EntityId, Step, Submarine, SubmarineSnapshot};
use crate::error::{FleetError, InvalidCommand};
use crate::events::{EventSink, SimEvent, TracingSink};
use crate::fire_control::{self, FireControlReport};
use crate::fleet::Fleet;
use crate::gate::{ActivationDecision, ActivationGate, CredentialCheck, ReferenceDate};
use crate::stream::CommandSource;

// =============================================================================
// Reports
// =============================================================================

/// Scheduler state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    /// At least one active submarine has a pending command.
    Running,
    /// A round is in progress.
    Draining,
    /// No active submarine has commands left.
    Terminated,
}

/// What happened in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round number, starting at 1
    pub round: u64,
    /// Submarines that applied a command
    pub moved: usize,
    /// Commands skipped or refused
    pub rejected: usize,
    /// Submarines whose stream ran out during this round
    pub exhausted: Vec<EntityId>,
    /// Collisions first seen this round
    pub collisions: Vec<Collision>,
    /// Active submarines after the round
    pub active: usize,
    /// State after the round
    pub state: RoundState,
}

impl RoundReport {
    /// Returns `true` if this was the last round.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.state == RoundState::Terminated
    }
}

/// Why a run ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every stream of every active submarine was consumed.
    Completed,
    /// The caller asked to stop between rounds.
    Stopped,
    /// `max_rounds` was reached with commands remaining.
    RoundCap,
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Rounds executed so far (over the simulation's lifetime)
    pub rounds: u64,
    /// Every collision recorded so far
    pub collisions: Vec<Collision>,
    /// Ids of submarines still active
    pub survivors: Vec<EntityId>,
    /// Final state of every submarine
    pub final_state: Vec<SubmarineSnapshot>,
    /// Why the run ended
    pub outcome: RunOutcome,
}

// =============================================================================
// Simulation
// =============================================================================

/// Owns the fleet and collision log and drives rounds.
pub struct Simulation {
    fleet: Fleet,
    detector: CollisionDetector,
    config: SimulationConfig,
    sink: Arc<dyn EventSink>,
    round: u64,
    state: RoundState,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("fleet", &self.fleet)
            .field("detector", &self.detector)
            .field("config", &self.config)
            .field("round", &self.round)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

type StepOutcome = (Step, Vec<InvalidCommand>);

fn step_one(submarine: &mut Submarine) -> StepOutcome {
    let step = submarine.step();
    (step, submarine.take_skipped())
}

impl Simulation {
    /// Creates a simulation over `fleet`, logging events through `tracing`.
    #[must_use]
    pub fn new(fleet: Fleet, config: SimulationConfig) -> Self {
        Self {
            fleet,
            detector: CollisionDetector::new(),
            config,
            sink: Arc::new(TracingSink),
            round: 0,
            state: RoundState::Running,
        }
    }

    /// Loads a fleet from `source` and creates a simulation over it.
    #[must_use]
    pub fn from_source<S: CommandSource + ?Sized>(source: &S, config: SimulationConfig) -> Self {
        Self::new(Fleet::from_source(source), config)
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Number of completed rounds.
    #[must_use]
    pub const fn round(&self) -> u64 {
        self.round
    }

    /// Current scheduler state.
    #[must_use]
    pub const fn state(&self) -> RoundState {
        self.state
    }

    /// Returns `true` once no active submarine has commands left.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state == RoundState::Terminated
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The fleet.
    #[must_use]
    pub const fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// The fleet, mutably. Changes take effect from the next round.
    pub fn fleet_mut(&mut self) -> &mut Fleet {
        if self.state == RoundState::Terminated {
            self.state = RoundState::Running;
        }
        &mut self.fleet
    }

    /// Every collision recorded so far.
    #[must_use]
    pub fn collisions(&self) -> &[Collision] {
        self.detector.log()
    }

    /// Snapshots every submarine in fleet order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SubmarineSnapshot> {
        self.fleet.snapshot()
    }

    fn emit(&self, event: &SimEvent) {
        self.sink.emit(event);
    }

    /// Primes every cursor and updates the state. Returns the submarines
    /// whose stream was found exhausted by this call.
    fn refresh_state(&mut self) -> Vec<EntityId> {
        let round = self.round;
        let mut pending = false;
        let mut exhausted = Vec::new();
        let mut rejected = Vec::new();

        for submarine in self.fleet.iter_mut() {
            let was_exhausted = submarine.is_exhausted();
            if submarine.has_pending() {
                pending = true;
                continue;
            }
            for error in submarine.take_skipped() {
                rejected.push((submarine.id().clone(), error));
            }
            if !was_exhausted && submarine.is_exhausted() {
                exhausted.push(submarine.id().clone());
            }
        }

        for (entity, error) in rejected {
            self.emit(&SimEvent::CommandRejected {
                round,
                entity,
                reason: error.to_string(),
            });
        }
        for entity in &exhausted {
            self.emit(&SimEvent::StreamExhausted {
                round,
                entity: entity.clone(),
            });
        }

        self.state = if pending {
            RoundState::Running
        } else {
            RoundState::Terminated
        };
        exhausted
    }

    /// Runs one round. Returns `None` without doing anything once the
    /// scheduler has terminated.
    pub fn step_round(&mut self) -> Option<RoundReport> {
        self.refresh_state();
        if self.state == RoundState::Terminated {
            return None;
        }

        self.round += 1;
        let round = self.round;
        let span = tracing::info_span!("round", round);
        let _entered = span.enter();

        self.state = RoundState::Draining;
        let steppable = self
            .fleet
            .iter()
            .filter(|s| s.is_active() && s.is_bound())
            .count();
        self.emit(&SimEvent::RoundStarted { round, steppable });

        // STEP + BARRIER
        let outcomes: Vec<StepOutcome> = match self.config.scheduling {
            Scheduling::Sequential => self.fleet.iter_mut().map(step_one).collect(),
            Scheduling::Parallel => self
                .fleet
                .as_mut_slice()
                .par_iter_mut()
                .map(step_one)
                .collect(),
        };

        let mut moved = 0;
        let mut rejected = 0;
        let mut exhausted = Vec::new();
        for (submarine, (step, skipped)) in self.fleet.iter().zip(outcomes) {
            let entity = submarine.id();
            for error in skipped {
                rejected += 1;
                self.emit(&SimEvent::CommandRejected {
                    round,
                    entity: entity.clone(),
                    reason: error.to_string(),
                });
            }
            match step {
                Step::Idle => {}
                Step::Moved { command, position } => {
                    moved += 1;
                    self.emit(&SimEvent::MovementApplied {
                        round,
                        entity: entity.clone(),
                        command,
                        position,
                    });
                }
                Step::Rejected { command, error } => {
                    rejected += 1;
                    self.emit(&SimEvent::CommandRejected {
                        round,
                        entity: entity.clone(),
                        reason: format!("{command}: {error}"),
                    });
                }
                Step::Exhausted => {
                    exhausted.push(entity.clone());
                    self.emit(&SimEvent::StreamExhausted {
                        round,
                        entity: entity.clone(),
                    });
                }
            }
        }

        // COLLIDE
        let collisions = self.detector.check(self.fleet.as_mut_slice());
        for collision in &collisions {
            self.emit(&SimEvent::CollisionDetected {
                round,
                collision: collision.clone(),
            });
        }
        for submarine in self.fleet.iter_mut() {
            if !submarine.is_active() && submarine.is_bound() {
                submarine.unbind();
            }
        }

        // REFRESH
        exhausted.extend(self.refresh_state());
        let active = self.fleet.active_count();
        self.emit(&SimEvent::RoundCompleted {
            round,
            moved,
            collisions: collisions.len(),
            active,
        });

        Some(RoundReport {
            round,
            moved,
            rejected,
            exhausted,
            collisions,
            active,
            state: self.state,
        })
    }

    /// Runs until every stream is consumed or `max_rounds` is reached.
    pub fn run(&mut self) -> RunSummary {
        self.run_with(|_, _| ControlFlow::Continue(()))
    }

    /// Runs like [`run`](Self::run), calling `on_round` with the round report
    /// and the fleet after every round. Returning [`ControlFlow::Break`] stops
    /// before the next round.
    pub fn run_with<F>(&mut self, mut on_round: F) -> RunSummary
    where
        F: FnMut(&RoundReport, &Fleet) -> ControlFlow<()>,
    {
        let outcome = loop {
            if self.at_round_cap() {
                break RunOutcome::RoundCap;
            }
            let Some(report) = self.step_round() else {
                break RunOutcome::Completed;
            };
            if on_round(&report, &self.fleet).is_break() {
                break if report.is_final() {
                    RunOutcome::Completed
                } else {
                    RunOutcome::Stopped
                };
            }
            if !report.is_final() && self.config.round_delay_ms > 0 {
                std::thread::sleep(self.config.round_delay());
            }
        };
        self.summary(outcome)
    }

    /// Runs like [`run`](Self::run) but checks `stop` before every round.
    pub fn run_until(&mut self, stop: &AtomicBool) -> RunSummary {
        if stop.load(Ordering::Acquire) {
            self.refresh_state();
            let outcome = if self.is_terminated() {
                RunOutcome::Completed
            } else {
                RunOutcome::Stopped
            };
            return self.summary(outcome);
        }
        self.run_with(|_, _| {
            if stop.load(Ordering::Acquire) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    fn at_round_cap(&mut self) -> bool {
        match self.config.max_rounds {
            Some(max) if self.round >= max => {
                self.refresh_state();
                !self.is_terminated()
            }
            _ => false,
        }
    }

    fn summary(&self, outcome: RunOutcome) -> RunSummary {
        tracing::info!(
            rounds = self.round,
            collisions = self.detector.len(),
            survivors = self.fleet.active_count(),
            ?outcome,
            "run finished"
        );
        RunSummary {
            rounds: self.round,
            collisions: self.detector.log().to_vec(),
            survivors: self.fleet.active().map(|s| s.id().clone()).collect(),
            final_state: self.fleet.snapshot(),
            outcome,
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Computes the fire-control report for `id` on the current positions.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::UnknownEntity`] if no such submarine exists.
    pub fn fire_control(&self, id: &str) -> Result<FireControlReport, FleetError> {
        let report = fire_control::scan(self.fleet.as_slice(), id)?;
        self.emit(&SimEvent::FireControlComputed {
            round: self.round,
            report: report.clone(),
        });
        Ok(report)
    }

    /// Evaluates an activation request for `id` on the current positions.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::UnknownEntity`] if no such submarine exists.
    pub fn request_activation<C: CredentialCheck>(
        &self,
        gate: &ActivationGate<C>,
        id: &str,
        proof: &str,
        date: ReferenceDate,
    ) -> Result<ActivationDecision, FleetError> {
        let report = self.fire_control(id)?;
        let decision = gate.evaluate(self.fleet.as_slice(), id, Some(&report), proof, date)?;
        self.emit(&SimEvent::ActivationDecided {
            round: self.round,
            target: decision.target.clone(),
            allowed: decision.allowed(),
            denials: decision.denials.clone(),
        });
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::events::RecordingSink;
    use crate::stream::ScriptedSource;
    use glam::IVec2;

    fn recorded(source: &ScriptedSource, config: SimulationConfig) -> (Simulation, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let sim = Simulation::from_source(source, config).with_sink(sink.clone());
        (sim, sink)
    }

    mod round_tests {
        use super::*;

        #[test]
        fn empty_fleet_runs_zero_rounds() {
            let mut sim = Simulation::new(Fleet::new(), SimulationConfig::default());
            assert!(sim.step_round().is_none());
            assert!(sim.is_terminated());
            assert_eq!(sim.run().rounds, 0);
        }

        #[test]
        fn all_empty_streams_run_zero_rounds() {
            let source = ScriptedSource::new()
                .with_script("A", vec![])
                .with_missing("B");
            let mut sim = Simulation::from_source(&source, SimulationConfig::default());
            let summary = sim.run();
            assert_eq!(summary.rounds, 0);
            assert_eq!(summary.outcome, RunOutcome::Completed);
            assert_eq!(summary.survivors.len(), 2);
        }

        #[test]
        fn runs_exactly_longest_stream_rounds() {
            let source = ScriptedSource::new()
                .with_script("A", vec![Command::up(1); 3])
                .with_script("B", vec![Command::down(1); 7]);
            let mut sim = Simulation::from_source(&source, SimulationConfig::default());
            let summary = sim.run();
            assert_eq!(summary.rounds, 7);
            assert_eq!(sim.fleet().get("A").unwrap().position(), IVec2::new(0, -3));
            assert_eq!(sim.fleet().get("B").unwrap().position(), IVec2::new(0, 7));
        }

        #[test]
        fn each_active_submarine_steps_once_per_round() {
            let source = ScriptedSource::new()
                .with_script("A", vec![Command::forward(1); 2])
                .with_script("B", vec![Command::up(1); 2]);
            let mut sim = Simulation::from_source(&source, SimulationConfig::default());
            let report = sim.step_round().unwrap();
            assert_eq!(report.round, 1);
            assert_eq!(report.moved, 2);
            assert_eq!(report.state, RoundState::Running);
            assert!(sim.fleet().iter().all(|s| s.history().len() == 1));
        }

        #[test]
        fn final_report_lists_exhausted_streams() {
            let source = ScriptedSource::new().with_script("A", vec![Command::up(1)]);
            let mut sim = Simulation::from_source(&source, SimulationConfig::default());
            let report = sim.step_round().unwrap();
            assert!(report.is_final());
            assert_eq!(report.exhausted, vec![EntityId::new("A")]);
            assert!(sim.step_round().is_none());
        }

        #[test]
        fn collided_submarines_lose_their_streams() {
            let source = ScriptedSource::new()
                .with_script("A", vec![Command::forward(1), Command::forward(1)])
                .with_script("B", vec![Command::forward(1), Command::forward(1)])
                .with_script("C", vec![Command::up(1); 3]);
            let mut sim = Simulation::from_source(&source, SimulationConfig::default());
            let report = sim.step_round().unwrap();
            assert_eq!(report.collisions.len(), 1);
            assert!(!sim.fleet().get("A").unwrap().is_bound());
            assert!(!sim.fleet().get("A").unwrap().is_exhausted());

            let summary = sim.run();
            assert_eq!(summary.rounds, 3);
            assert_eq!(sim.fleet().get("A").unwrap().history().len(), 1);
            assert_eq!(summary.survivors, vec![EntityId::new("C")]);
        }

        #[test]
        fn termination_when_only_destroyed_have_commands() {
            let source = ScriptedSource::new()
                .with_script("A", vec![Command::forward(1); 5])
                .with_script("B", vec![Command::forward(1); 5]);
            let mut sim = Simulation::from_source(&source, SimulationConfig::default());
            assert_eq!(sim.run().rounds, 1);
        }
    }

    mod run_control_tests {
        use super::*;

        fn long_source() -> ScriptedSource {
            ScriptedSource::new().with_script("A", vec![Command::forward(1); 10])
        }

        #[test]
        fn max_rounds_caps_the_run() {
            let mut sim =
                Simulation::from_source(&long_source(), SimulationConfig::default().with_max_rounds(4));
            let summary = sim.run();
            assert_eq!(summary.rounds, 4);
            assert_eq!(summary.outcome, RunOutcome::RoundCap);
        }

        #[test]
        fn cap_equal_to_length_completes() {
            let mut sim =
                Simulation::from_source(&long_source(), SimulationConfig::default().with_max_rounds(10));
            assert_eq!(sim.run().outcome, RunOutcome::Completed);
        }

        #[test]
        fn run_with_stops_between_rounds() {
            let mut sim = Simulation::from_source(&long_source(), SimulationConfig::default());
            let summary = sim.run_with(|report, _| {
                if report.round == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
            assert_eq!(summary.rounds, 2);
            assert_eq!(summary.outcome, RunOutcome::Stopped);
            assert_eq!(sim.fleet().get("A").unwrap().position(), IVec2::new(2, 0));

            let rest = sim.run();
            assert_eq!(rest.rounds, 10);
            assert_eq!(rest.outcome, RunOutcome::Completed);
        }

        #[test]
        fn run_until_honours_preset_flag() {
            let stop = AtomicBool::new(true);
            let mut sim = Simulation::from_source(&long_source(), SimulationConfig::default());
            let summary = sim.run_until(&stop);
            assert_eq!(summary.rounds, 0);
            assert_eq!(summary.outcome, RunOutcome::Stopped);
        }

        #[test]
        fn run_until_without_flag_completes() {
            let stop = AtomicBool::new(false);
            let mut sim = Simulation::from_source(&long_source(), SimulationConfig::default());
            assert_eq!(sim.run_until(&stop).outcome, RunOutcome::Completed);
        }

        #[test]
        fn round_delay_does_not_change_outcome() {
            let source = ScriptedSource::new()
                .with_script("A", vec![Command::forward(1); 2])
                .with_script("B", vec![Command::down(1); 2]);
            let mut plain = Simulation::from_source(&source, SimulationConfig::default());
            let mut slow = Simulation::from_source(
                &source,
                SimulationConfig::default().with_round_delay(std::time::Duration::from_millis(1)),
            );
            assert_eq!(plain.run(), slow.run());
        }
    }

    mod event_tests {
        use super::*;

        #[test]
        fn round_events_are_ordered() {
            let source = ScriptedSource::new().with_script("A", vec![Command::up(2)]);
            let (mut sim, sink) = recorded(&source, SimulationConfig::default());
            sim.run();
            let events = sink.take_events();
            assert!(matches!(events[0], SimEvent::RoundStarted { round: 1, steppable: 1 }));
            assert!(matches!(events[1], SimEvent::MovementApplied { round: 1, .. }));
            assert!(matches!(events[2], SimEvent::StreamExhausted { round: 1, .. }));
            assert!(matches!(
                events[3],
                SimEvent::RoundCompleted {
                    round: 1,
                    moved: 1,
                    collisions: 0,
                    active: 1
                }
            ));
            assert_eq!(events.len(), 4);
        }

        #[test]
        fn queries_emit_events() {
            let source = ScriptedSource::new().with_script("A", vec![]);
            let (sim, sink) = recorded(&source, SimulationConfig::default());
            let report = sim.fire_control("A").unwrap();
            assert!(report.all_clear());
            assert!(matches!(
                sink.take_events().as_slice(),
                [SimEvent::FireControlComputed { .. }]
            ));
            assert!(sim.fire_control("nobody").is_err());
            assert!(sink.is_empty());
        }
    }
}
