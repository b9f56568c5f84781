//! Structured simulation events and the sinks that receive them.
//!
//! The simulation emits a [`SimEvent`] at each defined point (round start,
//! movement, rejected command, exhaustion, collision, round end, fire-control
//! query, activation decision). Formatting and storage belong to the
//! [`EventSink`], which is injected into the simulation.
//!
//! # Sinks
//!
//! - [`TracingSink`]: forwards events to `tracing` with structured fields
//! - [`RecordingSink`]: keeps events in memory, drained with `take_events()`
//! - [`NullSink`]: discards everything

use std::sync::{Mutex, PoisonError};

use glam::IVec2;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::collision::Collision;
use crate::command::{Command, Direction};
use crate::entity::EntityId;
use crate::fire_control::FireControlReport;
use crate::gate::Denial;

/// Category of a [`SimEvent`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Round boundaries
    Round,
    /// Applied or rejected commands
    Movement,
    /// Command stream lifecycle
    Stream,
    /// Collisions
    Collision,
    /// Fire-control queries
    FireControl,
    /// Activation decisions
    Activation,
}

/// A structured event emitted by the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    /// A round began.
    RoundStarted {
        /// Round number, starting at 1
        round: u64,
        /// Submarines with a pending command
        steppable: usize,
    },
    /// A submarine applied a command.
    MovementApplied {
        /// Round number
        round: u64,
        /// The submarine
        entity: EntityId,
        /// The applied command
        command: Command,
        /// Position after the move
        position: IVec2,
    },
    /// A command was skipped or refused for a submarine.
    CommandRejected {
        /// Round number
        round: u64,
        /// The submarine
        entity: EntityId,
        /// Why it was rejected
        reason: String,
    },
    /// A submarine's stream ran out.
    StreamExhausted {
        /// Round number
        round: u64,
        /// The submarine
        entity: EntityId,
    },
    /// Two submarines met in one cell.
    CollisionDetected {
        /// Round number
        round: u64,
        /// The collision record
        collision: Collision,
    },
    /// A round finished.
    RoundCompleted {
        /// Round number
        round: u64,
        /// Submarines that moved this round
        moved: usize,
        /// New collisions this round
        collisions: usize,
        /// Submarines still active after the round
        active: usize,
    },
    /// A fire-control report was computed.
    FireControlComputed {
        /// Last completed round
        round: u64,
        /// The report
        report: FireControlReport,
    },
    /// An activation request was decided.
    ActivationDecided {
        /// Last completed round
        round: u64,
        /// The target
        target: EntityId,
        /// Whether activation is allowed
        allowed: bool,
        /// Reasons for refusal
        denials: Vec<Denial>,
    },
}

impl SimEvent {
    /// The event's category.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::RoundStarted { .. } | Self::RoundCompleted { .. } => EventKind::Round,
            Self::MovementApplied { .. } | Self::CommandRejected { .. } => EventKind::Movement,
            Self::StreamExhausted { .. } => EventKind::Stream,
            Self::CollisionDetected { .. } => EventKind::Collision,
            Self::FireControlComputed { .. } => EventKind::FireControl,
            Self::ActivationDecided { .. } => EventKind::Activation,
        }
    }

    /// Severity used when the event is logged.
    #[must_use]
    pub const fn level(&self) -> Level {
        match self {
            Self::MovementApplied { .. } | Self::StreamExhausted { .. } | Self::RoundStarted { .. } => {
                Level::DEBUG
            }
            Self::CommandRejected { .. } | Self::CollisionDetected { .. } => Level::WARN,
            Self::ActivationDecided { allowed: false, .. } => Level::WARN,
            Self::RoundCompleted { .. }
            | Self::FireControlComputed { .. }
            | Self::ActivationDecided { .. } => Level::INFO,
        }
    }

    /// Round number carried by the event.
    #[must_use]
    pub const fn round(&self) -> u64 {
        match self {
            Self::RoundStarted { round, .. }
            | Self::MovementApplied { round, .. }
            | Self::CommandRejected { round, .. }
            | Self::StreamExhausted { round, .. }
            | Self::CollisionDetected { round, .. }
            | Self::RoundCompleted { round, .. }
            | Self::FireControlComputed { round, .. }
            | Self::ActivationDecided { round, .. } => *round,
        }
    }
}

/// Receives simulation events.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: &SimEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

fn lane_list(directions: impl Iterator<Item = Direction>) -> String {
    directions.map(Direction::as_str).collect::<Vec<_>>().join(",")
}

impl EventSink for TracingSink {
    fn emit(&self, event: &SimEvent) {
        match event {
            SimEvent::RoundStarted { round, steppable } => {
                tracing::debug!(round, steppable, "round started");
            }
            SimEvent::MovementApplied {
                round,
                entity,
                command,
                position,
            } => {
                tracing::debug!(
                    round,
                    entity = %entity,
                    command = %command,
                    x = position.x,
                    y = position.y,
                    "movement applied"
                );
            }
            SimEvent::CommandRejected {
                round,
                entity,
                reason,
            } => {
                tracing::warn!(round, entity = %entity, reason = %reason, "command rejected");
            }
            SimEvent::StreamExhausted { round, entity } => {
                tracing::debug!(round, entity = %entity, "command stream exhausted");
            }
            SimEvent::CollisionDetected { round, collision } => {
                let (a, b) = collision.ids();
                tracing::warn!(
                    round,
                    first = %a,
                    second = %b,
                    x = collision.position().x,
                    y = collision.position().y,
                    "collision detected"
                );
            }
            SimEvent::RoundCompleted {
                round,
                moved,
                collisions,
                active,
            } => {
                tracing::info!(round, moved, collisions, active, "round completed");
            }
            SimEvent::FireControlComputed { round, report } => {
                let shooter = report
                    .shooter
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                tracing::info!(
                    round,
                    shooter = %shooter,
                    unsafe_lanes = %lane_list(report.unsafe_directions().into_iter()),
                    "fire control computed"
                );
            }
            SimEvent::ActivationDecided {
                round,
                target,
                allowed,
                denials,
            } => {
                let reasons = denials
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                if *allowed {
                    tracing::info!(round, target = %target, "activation allowed");
                } else {
                    tracing::warn!(round, target = %target, reasons = %reasons, "activation denied");
                }
            }
        }
    }
}

/// Keeps every event in memory.
///
/// The log is behind a `Mutex` so the sink satisfies `Send + Sync`; the
/// simulation only emits from one thread.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SimEvent>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns all recorded events in emission order.
    pub fn take_events(&self) -> Vec<SimEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *events)
    }

    /// Number of events currently recorded.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    /// Discards all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SimEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &SimEvent) {}
}
