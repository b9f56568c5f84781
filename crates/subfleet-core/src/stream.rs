//! Command streams and the sources that provide them.
//!
//! A [`CommandStream`] is a lazy, forward-only sequence of commands owned by
//! exactly one submarine. Providers hand the core `Err` items for input they
//! could not parse; the [`CommandCursor`] skips those so one bad line never
//! costs a round or halts the loop.
//!
//! [`CommandSource`] is the seam to external providers. It covers both
//! enumeration (which submarines exist) and opening a stream per submarine.

use std::fmt;

use crate::command::Command;
use crate::entity::EntityId;
use crate::error::InvalidCommand;

/// A lazy, finite sequence of commands for a single submarine.
pub type CommandStream = Box<dyn Iterator<Item = Result<Command, InvalidCommand>> + Send>;

/// Wraps any iterator of commands into a [`CommandStream`].
pub fn stream_of<I>(commands: I) -> CommandStream
where
    I: IntoIterator<Item = Command>,
    I::IntoIter: Send + 'static,
{
    Box::new(commands.into_iter().map(Ok))
}

// =============================================================================
// CommandCursor
// =============================================================================

/// Exclusive read handle into a command stream with one-item lookahead.
///
/// Malformed items are skipped as they are encountered and kept until
/// [`take_skipped`](Self::take_skipped) drains them, so callers can report
/// them without the cursor depending on any sink.
pub struct CommandCursor {
    owner: EntityId,
    stream: CommandStream,
    peeked: Option<Command>,
    skipped: Vec<InvalidCommand>,
    skipped_total: u64,
    pulled: u64,
}

impl CommandCursor {
    /// Creates a cursor over `stream` for the submarine `owner`.
    #[must_use]
    pub fn new(owner: EntityId, stream: CommandStream) -> Self {
        Self {
            owner,
            stream,
            peeked: None,
            skipped: Vec::new(),
            skipped_total: 0,
            pulled: 0,
        }
    }

    /// Returns the next valid command without consuming it.
    pub fn peek(&mut self) -> Option<&Command> {
        if self.peeked.is_none() {
            self.peeked = self.advance();
        }
        self.peeked.as_ref()
    }

    /// Number of commands handed out so far.
    #[must_use]
    pub const fn pulled(&self) -> u64 {
        self.pulled
    }

    /// Number of malformed items skipped over the cursor's lifetime.
    #[must_use]
    pub const fn skipped_total(&self) -> u64 {
        self.skipped_total
    }

    /// Drains the malformed items skipped since the last call.
    pub fn take_skipped(&mut self) -> Vec<InvalidCommand> {
        std::mem::take(&mut self.skipped)
    }

    fn advance(&mut self) -> Option<Command> {
        loop {
            match self.stream.next()? {
                Ok(command) => return Some(command),
                Err(error) => {
                    tracing::warn!(entity = %self.owner, %error, "skipping malformed command");
                    self.skipped_total += 1;
                    self.skipped.push(error);
                }
            }
        }
    }
}

impl Iterator for CommandCursor {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        let next = self.peeked.take().or_else(|| self.advance());
        if next.is_some() {
            self.pulled += 1;
        }
        next
    }
}

impl fmt::Debug for CommandCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCursor")
            .field("owner", &self.owner)
            .field("peeked", &self.peeked)
            .field("pulled", &self.pulled)
            .field("skipped_total", &self.skipped_total)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// CommandSource
// =============================================================================

/// Supplies the initial submarine ids and one command stream per id.
pub trait CommandSource {
    /// Ids of the submarines to create, in load order.
    fn entity_ids(&self) -> Vec<EntityId>;

    /// Opens a fresh stream for `id`, or `None` if the source has no data.
    fn open(&self, id: &EntityId) -> Option<CommandStream>;
}

type RawItem = Result<Command, InvalidCommand>;

/// In-memory command source for tests, benches and synthetic fleets.
///
/// Scripts are kept in insertion order and reopened from the start on every
/// [`open`](CommandSource::open). An id registered with
/// [`with_missing`](Self::with_missing) is enumerated but has no stream.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    scripts: Vec<(EntityId, Option<Vec<RawItem>>)>,
}

impl ScriptedSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a script of validated commands. Replaces an existing script for
    /// the same id without changing its position.
    #[must_use]
    pub fn with_script(mut self, id: impl Into<EntityId>, commands: Vec<Command>) -> Self {
        self.insert(id.into(), Some(commands.into_iter().map(Ok).collect()));
        self
    }

    /// Adds a script of raw `(direction, distance)` pairs.
    ///
    /// Pairs that fail validation become malformed items that the cursor
    /// skips.
    #[must_use]
    pub fn with_raw_script(mut self, id: impl Into<EntityId>, raw: &[(&str, i64)]) -> Self {
        let items = raw
            .iter()
            .map(|&(direction, distance)| Command::parse(direction, distance))
            .collect();
        self.insert(id.into(), Some(items));
        self
    }

    /// Adds a script with explicit malformed entries.
    #[must_use]
    pub fn with_items(mut self, id: impl Into<EntityId>, items: Vec<RawItem>) -> Self {
        self.insert(id.into(), Some(items));
        self
    }

    /// Adds an id that is enumerated but has no stream.
    #[must_use]
    pub fn with_missing(mut self, id: impl Into<EntityId>) -> Self {
        self.insert(id.into(), None);
        self
    }

    /// Number of enumerated ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Returns `true` if no ids are enumerated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Length of the longest script, counting valid commands only.
    #[must_use]
    pub fn longest_script(&self) -> usize {
        self.scripts
            .iter()
            .filter_map(|(_, items)| items.as_ref())
            .map(|items| items.iter().filter(|item| item.is_ok()).count())
            .max()
            .unwrap_or(0)
    }

    /// Valid commands of the script for `id`, in order.
    #[must_use]
    pub fn commands(&self, id: &EntityId) -> Vec<Command> {
        self.scripts
            .iter()
            .find(|(known, _)| known == id)
            .and_then(|(_, items)| items.as_ref())
            .map(|items| items.iter().filter_map(|item| item.clone().ok()).collect())
            .unwrap_or_default()
    }

    fn insert(&mut self, id: EntityId, items: Option<Vec<RawItem>>) {
        match self.scripts.iter_mut().find(|(known, _)| *known == id) {
            Some((_, existing)) => *existing = items,
            None => self.scripts.push((id, items)),
        }
    }
}

impl CommandSource for ScriptedSource {
    fn entity_ids(&self) -> Vec<EntityId> {
        self.scripts.iter().map(|(id, _)| id.clone()).collect()
    }

    fn open(&self, id: &EntityId) -> Option<CommandStream> {
        let items = self
            .scripts
            .iter()
            .find(|(known, _)| known == id)
            .and_then(|(_, items)| items.clone())?;
        Some(Box::new(items.into_iter()))
    }
}

impl<S: CommandSource + ?Sized> CommandSource for &S {
    fn entity_ids(&self) -> Vec<EntityId> {
        (**self).entity_ids()
    }

    fn open(&self, id: &EntityId) -> Option<CommandStream> {
        (**self).open(id)
    }
}
