//! Submarine entities.
//!
//! This module provides the entity types the simulation moves around:
//! - [`EntityId`]: unique, immutable string identifier
//! - [`Submarine`]: position, status flags, command cursor and move history
//! - [`SubmarineSnapshot`]: owned, serializable copy of a submarine's state
//! - [`Contact`]: read-only view shared by live submarines and snapshots
//!
//! # Movement
//!
//! A submarine's position changes only through [`Submarine::apply_command`]
//! (or the `apply_movement`/`apply_raw` wrappers around it). Validation runs
//! before anything is touched, so a rejected command leaves position and
//! history unchanged.
//!
//! # Example
//!
//! ```
//! use glam::IVec2;
//! use subfleet_core::command::Direction;
//! use subfleet_core::entity::{EntityId, Submarine};
//!
//! let mut sub = Submarine::new(EntityId::new("A"));
//! sub.apply_movement(Direction::Forward, 5).unwrap();
//! sub.apply_movement(Direction::Up, 2).unwrap();
//!
//! assert_eq!(sub.position(), IVec2::new(5, -2));
//! assert_eq!(sub.history().len(), 2);
//! assert!(sub.apply_raw("backward", 1).is_err());
//! ```

pub mod components;

use std::borrow::Borrow;
use std::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};

pub use components::StatusFlags;

use crate::command::{Command, Direction};
use crate::error::InvalidCommand;
use crate::stream::{CommandCursor, CommandStream};

/// Unique identifier for a submarine.
///
/// Ids are opaque strings (typically the stem of a movement-report file).
/// They order lexicographically, which is used wherever a canonical order
/// between two ids is needed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new `EntityId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Read-only view of anything that occupies a grid cell.
///
/// Fire control, activation and distance analysis are generic over this, so
/// they run equally on the live fleet and on snapshots of earlier rounds.
pub trait Contact {
    /// The contact's identifier.
    fn id(&self) -> &EntityId;
    /// The contact's current cell.
    fn position(&self) -> IVec2;
    /// `false` once destroyed.
    fn is_active(&self) -> bool;
}

/// Outcome of a single [`Submarine::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing happened: destroyed, or no stream bound.
    Idle,
    /// A command was pulled and applied.
    Moved {
        /// The applied command
        command: Command,
        /// Position after the move
        position: IVec2,
    },
    /// A command was pulled but failed validation; state is unchanged.
    Rejected {
        /// The pulled command
        command: Command,
        /// Why it was rejected
        error: InvalidCommand,
    },
    /// The stream ran out; the cursor has been released.
    Exhausted,
}

/// A submarine: identity, grid position, status and its command cursor.
///
/// The cursor is owned exclusively by the submarine. Once it is cleared
/// (exhaustion, collision or [`unbind`](Self::unbind)) the submarine can no
/// longer step until a new stream is bound.
#[derive(Debug)]
pub struct Submarine {
    id: EntityId,
    position: IVec2,
    status: StatusFlags,
    cursor: Option<CommandCursor>,
    history: Vec<Command>,
    skipped: Vec<InvalidCommand>,
    skipped_released: u64,
}

impl Submarine {
    /// Creates a submarine at the origin with no stream bound.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self::at(id, IVec2::ZERO)
    }

    /// Creates a submarine at `position` with no stream bound.
    #[must_use]
    pub fn at(id: EntityId, position: IVec2) -> Self {
        Self {
            id,
            position,
            status: StatusFlags::empty(),
            cursor: None,
            history: Vec::new(),
            skipped: Vec::new(),
            skipped_released: 0,
        }
    }

    /// Builder form of [`bind`](Self::bind).
    #[must_use]
    pub fn with_stream(mut self, stream: CommandStream) -> Self {
        self.bind(stream);
        self
    }

    /// Returns the submarine's identifier.
    #[must_use]
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns the current grid position.
    #[must_use]
    pub const fn position(&self) -> IVec2 {
        self.position
    }

    /// Returns the status flags.
    #[must_use]
    pub const fn status(&self) -> StatusFlags {
        self.status
    }

    /// Returns `true` until the submarine is destroyed.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Returns `true` once the bound stream ran out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.status.contains(StatusFlags::EXHAUSTED)
    }

    /// Returns `true` if a cursor is bound.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.cursor.is_some()
    }

    /// Applied commands, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Command] {
        &self.history
    }

    /// Malformed stream items skipped over the submarine's lifetime.
    #[must_use]
    pub fn skipped_total(&self) -> u64 {
        self.skipped_released + self.cursor.as_ref().map_or(0, CommandCursor::skipped_total)
    }

    // -------------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------------

    /// Applies a validated command and returns the new position.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCommand::OutOfBounds`] if the move would overflow a
    /// coordinate. Position and history are unchanged on error.
    pub fn apply_command(&mut self, command: Command) -> Result<IVec2, InvalidCommand> {
        let next = command
            .direction
            .offset(self.position, command.distance)
            .ok_or(InvalidCommand::OutOfBounds {
                direction: command.direction,
                distance: command.distance,
                from: self.position,
            })?;
        self.position = next;
        self.history.push(command);
        Ok(next)
    }

    /// Validates `distance` and moves in `direction`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Command::new`] and [`apply_command`](Self::apply_command).
    pub fn apply_movement(
        &mut self,
        direction: Direction,
        distance: i64,
    ) -> Result<IVec2, InvalidCommand> {
        let command = Command::new(direction, distance)?;
        self.apply_command(command)
    }

    /// Parses and applies a raw `(direction, distance)` pair.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Command::parse`] and [`apply_command`](Self::apply_command).
    pub fn apply_raw(&mut self, direction: &str, distance: i64) -> Result<IVec2, InvalidCommand> {
        let command = Command::parse(direction, distance)?;
        self.apply_command(command)
    }

    // -------------------------------------------------------------------------
    // Stream handling
    // -------------------------------------------------------------------------

    /// Binds a fresh command stream, replacing any existing cursor.
    pub fn bind(&mut self, stream: CommandStream) {
        self.drop_cursor();
        self.cursor = Some(CommandCursor::new(self.id.clone(), stream));
        self.status.remove(StatusFlags::EXHAUSTED);
    }

    /// Drops the cursor so the submarine never steps again.
    pub fn unbind(&mut self) {
        self.drop_cursor();
    }

    /// Marks the submarine destroyed. Returns `true` if it was active.
    pub fn destroy(&mut self) -> bool {
        let was_active = self.is_active();
        self.status.insert(StatusFlags::DESTROYED);
        was_active
    }

    /// Returns `true` if the next [`step`](Self::step) would pull a command.
    ///
    /// Primes the cursor's lookahead. If the stream turns out to be empty the
    /// cursor is released and the submarine is flagged exhausted.
    pub fn has_pending(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return false;
        };
        if cursor.peek().is_some() {
            true
        } else {
            self.release_cursor();
            false
        }
    }

    /// Pulls one command from the bound stream and applies it.
    ///
    /// A destroyed or unbound submarine is a no-op. Exhaustion releases the
    /// cursor but does not deactivate the submarine.
    pub fn step(&mut self) -> Step {
        if !self.is_active() {
            return Step::Idle;
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Step::Idle;
        };
        match cursor.next() {
            Some(command) => match self.apply_command(command) {
                Ok(position) => Step::Moved { command, position },
                Err(error) => Step::Rejected { command, error },
            },
            None => {
                self.release_cursor();
                Step::Exhausted
            }
        }
    }

    /// Drains malformed items skipped since the last call, including those
    /// seen by a cursor that has since been released.
    pub fn take_skipped(&mut self) -> Vec<InvalidCommand> {
        let mut skipped = std::mem::take(&mut self.skipped);
        if let Some(cursor) = self.cursor.as_mut() {
            skipped.extend(cursor.take_skipped());
        }
        skipped
    }

    fn drop_cursor(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            self.skipped.extend(cursor.take_skipped());
            self.skipped_released += cursor.skipped_total();
        }
    }

    fn release_cursor(&mut self) {
        self.drop_cursor();
        self.status.insert(StatusFlags::EXHAUSTED);
    }

    /// Captures an owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SubmarineSnapshot {
        SubmarineSnapshot {
            id: self.id.clone(),
            position: self.position,
            active: self.is_active(),
            exhausted: self.is_exhausted(),
            moves: self.history.len(),
            history: self.history.clone(),
        }
    }
}

impl Contact for Submarine {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn position(&self) -> IVec2 {
        self.position
    }

    fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Owned, serializable state of one submarine at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmarineSnapshot {
    /// Submarine id
    pub id: EntityId,
    /// Grid position
    pub position: IVec2,
    /// `false` once destroyed
    pub active: bool,
    /// `true` once the stream ran out
    pub exhausted: bool,
    /// Number of applied commands
    pub moves: usize,
    /// Applied commands, oldest first
    pub history: Vec<Command>,
}

impl Contact for SubmarineSnapshot {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn position(&self) -> IVec2 {
        self.position
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
