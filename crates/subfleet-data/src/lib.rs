//! # Subfleet Data
//!
//! File-backed collaborators for the fleet simulation core.
//!
//! Everything here reads from (or, for [`writer`], writes to) a data
//! directory described by [`DataLayout`]:
//!
//! - **Movement reports**: [`MovementReports`] implements
//!   [`CommandSource`](subfleet_core::CommandSource) with one lazy stream per file
//! - **Secrets**: [`SecretStore`] holds secret keys and activation codes
//! - **Credentials**: [`DigestVerifier`] implements
//!   [`CredentialCheck`](subfleet_core::CredentialCheck) with SHA-256 proofs
//! - **Sensors**: [`SensorAnalyzer`] reads one pattern per round and tallies errors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use subfleet_core::{Simulation, SimulationConfig};
//! use subfleet_data::{DataLayout, MovementReports};
//!
//! let reports = MovementReports::new(DataLayout::new("data"));
//! let mut sim = Simulation::from_source(&reports, SimulationConfig::default());
//! let summary = sim.run();
//! println!("{} collisions", summary.collisions.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod credential;
pub mod error;
pub mod layout;
pub mod movement;
pub mod secrets;
pub mod sensor;
pub mod writer;

pub use credential::DigestVerifier;
pub use error::DataError;
pub use layout::{DataLayout, DEFAULT_MAX_LINES};
pub use movement::MovementReports;
pub use secrets::SecretStore;
pub use sensor::{SensorAnalyzer, SensorReading, SensorSummary};
pub use writer::write_movement_reports;
