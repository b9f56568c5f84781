//! # Subfleet Core
//!
//! Round-based simulation of a submarine fleet on an integer grid.
//!
//! Each submarine consumes its own lazy stream of movement commands. Rounds
//! advance every active submarine by one command, then run a single collision
//! pass. Fire-control scans and activation checks are read-only queries on the
//! current (or any snapshotted) positions.
//!
//! ## Architecture
//!
//! - **Entities**: [`entity::Submarine`] with position, status and cursor
//! - **Streams**: [`stream::CommandSource`] supplies ids and command streams
//! - **Fleet**: [`fleet::Fleet`] stores submarines in load order
//! - **Collisions**: [`collision::CollisionDetector`] owns the dedup log
//! - **Fire control**: [`fire_control::scan`] reports the nearest contact per lane
//! - **Gate**: [`gate::ActivationGate`] combines the veto with a credential check
//! - **Scheduler**: [`simulation::Simulation`] drives rounds and emits events
//!
//! ## Usage
//!
//! ```
//! use subfleet_core::command::Command;
//! use subfleet_core::config::SimulationConfig;
//! use subfleet_core::simulation::Simulation;
//! use subfleet_core::stream::ScriptedSource;
//!
//! let source = ScriptedSource::new()
//!     .with_script("A", vec![Command::forward(3)])
//!     .with_script("B", vec![Command::down(2)]);
//!
//! let mut sim = Simulation::from_source(&source, SimulationConfig::parallel());
//! let summary = sim.run();
//! assert_eq!(summary.survivors.len(), 2);
//!
//! let report = sim.fire_control("B").unwrap();
//! assert!(report.all_clear());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod collision;
pub mod command;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod fire_control;
pub mod fleet;
pub mod gate;
pub mod hash;
pub mod scenario;
pub mod simulation;
pub mod stream;

pub use collision::{Collision, CollisionDetector};
pub use command::{Command, Direction};
pub use config::{Scheduling, SimulationConfig};
pub use entity::{Contact, EntityId, Submarine, SubmarineSnapshot};
pub use error::{ConfigError, FleetError, InvalidCommand};
pub use events::{EventSink, RecordingSink, SimEvent, TracingSink};
pub use fire_control::FireControlReport;
pub use fleet::Fleet;
pub use gate::{ActivationDecision, ActivationGate, CredentialCheck, CredentialError, ReferenceDate};
pub use simulation::{RoundReport, RunOutcome, RunSummary, Simulation};
pub use stream::{CommandSource, CommandStream, ScriptedSource};

#[cfg(test)]
mod tests;
