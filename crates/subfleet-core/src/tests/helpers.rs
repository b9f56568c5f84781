//! Test helper functions for setting up fleets and simulations.

use std::sync::Arc;

use glam::IVec2;

use crate::command::Command;
use crate::config::SimulationConfig;
use crate::entity::{EntityId, Submarine};
use crate::events::{RecordingSink, SimEvent};
use crate::fleet::Fleet;
use crate::gate::{CredentialCheck, CredentialError, ReferenceDate};
use crate::simulation::Simulation;
use crate::stream::{stream_of, ScriptedSource};

// =============================================================================
// Fleet Setup
// =============================================================================

/// Builds a fleet of unbound submarines at fixed positions.
pub fn fleet_at(positions: &[(&str, i32, i32)]) -> Fleet {
    let mut fleet = Fleet::new();
    for &(id, x, y) in positions {
        fleet
            .spawn(id, IVec2::new(x, y))
            .expect("test ids are unique");
    }
    fleet
}

/// Builds a fleet from `(id, start, script)` triples.
pub fn fleet_with_scripts(entries: Vec<(&str, IVec2, Vec<Command>)>) -> Fleet {
    let mut fleet = Fleet::new();
    for (id, start, script) in entries {
        let submarine = Submarine::at(EntityId::new(id), start).with_stream(stream_of(script));
        fleet.insert(submarine).expect("test ids are unique");
    }
    fleet
}

/// Creates a simulation that records every event.
pub fn recorded_simulation(
    source: &ScriptedSource,
    config: SimulationConfig,
) -> (Simulation, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let sim = Simulation::from_source(source, config).with_sink(sink.clone());
    (sim, sink)
}

/// Position of `id`, panicking if it does not exist.
pub fn position_of(sim: &Simulation, id: &str) -> IVec2 {
    sim.fleet().get(id).expect("entity exists").position()
}

/// Returns `true` if `id` is still active.
pub fn is_active(sim: &Simulation, id: &str) -> bool {
    sim.fleet().get(id).expect("entity exists").is_active()
}

/// Counts events matching `pred`.
pub fn count_events(events: &[SimEvent], pred: impl Fn(&SimEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

// =============================================================================
// Credentials
// =============================================================================

/// Credential check that accepts exactly one proof string.
pub struct AcceptProof(pub &'static str);

impl CredentialCheck for AcceptProof {
    fn verify(
        &self,
        entity: &EntityId,
        proof: &str,
        _date: ReferenceDate,
    ) -> Result<(), CredentialError> {
        if proof == self.0 {
            Ok(())
        } else {
            Err(CredentialError::VerificationFailed(entity.clone()))
        }
    }
}

/// A fixed reference date.
pub fn test_date() -> ReferenceDate {
    ReferenceDate::new(2024, 6, 15).expect("valid date")
}
