//! Error types for the fleet simulation core.
//!
//! Each error models a single failure mode and carries enough context to be
//! logged without reproducing the issue:
//!
//! - [`InvalidCommand`]: a movement command that must not be applied
//! - [`FleetError`]: lookups and bindings against the fleet container
//! - [`ConfigError`]: simulation configuration that could not be loaded
//!
//! Credential failures live next to the activation gate
//! ([`CredentialError`](crate::gate::CredentialError)) because they are
//! produced by an external collaborator, not by the core.

use std::path::PathBuf;

use glam::IVec2;
use thiserror::Error;

use crate::command::Direction;
use crate::entity::EntityId;

/// A movement command that was rejected before any state was touched.
///
/// Raised by [`Command::parse`](crate::command::Command::parse) and by the
/// `apply_*` family on [`Submarine`](crate::entity::Submarine). Command
/// providers also use the `Malformed` variant to hand unparseable input to the
/// core, which skips it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCommand {
    /// The direction word is not one of `up`, `down`, `forward`.
    #[error("unknown direction `{0}` (expected up, down or forward)")]
    UnknownDirection(String),

    /// The distance is below zero.
    #[error("distance {0} must be non-negative")]
    NegativeDistance(i64),

    /// The distance does not fit the grid's coordinate range.
    #[error("distance {0} exceeds the grid coordinate range")]
    DistanceTooLarge(i64),

    /// Applying the move would overflow a coordinate.
    #[error("moving {direction} {distance} from {from} leaves the grid")]
    OutOfBounds {
        /// Requested direction
        direction: Direction,
        /// Requested distance
        distance: u32,
        /// Position before the move
        from: IVec2,
    },

    /// The provider could not turn its input into a command at all.
    #[error("malformed command: {0}")]
    Malformed(String),
}

/// Errors raised by fleet lookups, stream binding and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    /// No entity with this id exists in the fleet.
    #[error("unknown entity `{0}`")]
    UnknownEntity(EntityId),

    /// An entity with this id already exists in the fleet.
    #[error("entity `{0}` already exists")]
    DuplicateEntity(EntityId),

    /// A fire-control report was supplied for a different shooter.
    #[error("fire-control report belongs to `{found}`, not `{expected}`")]
    ReportMismatch {
        /// The entity the caller asked about
        expected: EntityId,
        /// The shooter recorded in the report (`-` for an external origin)
        found: String,
    },

    /// A command was rejected for an entity.
    #[error(transparent)]
    InvalidCommand(#[from] InvalidCommand),
}

/// Errors raised while loading a [`SimulationConfig`](crate::config::SimulationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid JSON for the config schema.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
