//! Fleet container for the simulation.
//!
//! The Fleet owns every submarine for one run. It provides:
//! - Insertion-ordered storage, so round stepping, event emission and
//!   collision grouping are reproducible
//! - An id index for constant-time lookup
//! - Loading from a [`CommandSource`] (enumerate ids, spawn, bind streams)
//!
//! Submarines are created once at load time and never removed; destroyed
//! submarines stay in the fleet with their final position.
//!
//! # Example
//!
//! ```
//! use subfleet_core::command::Command;
//! use subfleet_core::fleet::Fleet;
//! use subfleet_core::stream::ScriptedSource;
//!
//! let source = ScriptedSource::new()
//!     .with_script("A", vec![Command::forward(5)])
//!     .with_script("B", vec![Command::down(1)]);
//!
//! let fleet = Fleet::from_source(&source);
//! assert_eq!(fleet.len(), 2);
//! assert!(fleet.get("A").unwrap().is_bound());
//! ```

use std::collections::HashMap;

use glam::IVec2;

use crate::entity::{EntityId, Submarine, SubmarineSnapshot};
use crate::error::FleetError;
use crate::stream::{CommandSource, CommandStream};

/// Insertion-ordered collection of submarines with an id index.
#[derive(Debug, Default)]
pub struct Fleet {
    submarines: Vec<Submarine>,
    index: HashMap<EntityId, usize>,
}

impl Fleet {
    /// Creates an empty fleet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fleet from a command source.
    ///
    /// One submarine is spawned at the origin per enumerated id. Duplicate
    /// ids are skipped and an id the source has no stream for is kept but
    /// never moves; both cases are logged as warnings.
    #[must_use]
    pub fn from_source<S: CommandSource + ?Sized>(source: &S) -> Self {
        let mut fleet = Self::new();
        for id in source.entity_ids() {
            if fleet.contains(&id) {
                tracing::warn!(entity = %id, "duplicate entity id in source, skipping");
                continue;
            }
            let mut submarine = Submarine::new(id.clone());
            match source.open(&id) {
                Some(stream) => submarine.bind(stream),
                None => tracing::warn!(entity = %id, "no command stream, entity will not move"),
            }
            fleet.push(submarine);
        }
        tracing::debug!(entities = fleet.len(), "fleet loaded");
        fleet
    }

    /// Spawns a submarine at `position` with no stream bound.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::DuplicateEntity`] if the id is taken.
    pub fn spawn(&mut self, id: impl Into<EntityId>, position: IVec2) -> Result<&mut Submarine, FleetError> {
        self.insert(Submarine::at(id.into(), position))
    }

    /// Adds an existing submarine.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::DuplicateEntity`] if the id is taken.
    pub fn insert(&mut self, submarine: Submarine) -> Result<&mut Submarine, FleetError> {
        if self.contains(submarine.id()) {
            return Err(FleetError::DuplicateEntity(submarine.id().clone()));
        }
        let slot = self.push(submarine);
        Ok(&mut self.submarines[slot])
    }

    fn push(&mut self, submarine: Submarine) -> usize {
        let slot = self.submarines.len();
        self.index.insert(submarine.id().clone(), slot);
        self.submarines.push(submarine);
        slot
    }

    /// Binds `stream` to the submarine `id`.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::UnknownEntity`] if no such submarine exists.
    pub fn bind(&mut self, id: &str, stream: CommandStream) -> Result<(), FleetError> {
        let submarine = self
            .get_mut(id)
            .ok_or_else(|| FleetError::UnknownEntity(EntityId::new(id)))?;
        submarine.bind(stream);
        Ok(())
    }

    /// Binds externally supplied streams by id.
    ///
    /// Streams for ids with no submarine are logged and dropped. Returns the
    /// number of streams bound.
    pub fn attach_streams<I>(&mut self, streams: I) -> usize
    where
        I: IntoIterator<Item = (EntityId, CommandStream)>,
    {
        let mut bound = 0;
        for (id, stream) in streams {
            match self.bind(id.as_str(), stream) {
                Ok(()) => bound += 1,
                Err(error) => tracing::warn!(%error, "stream references no entity, skipping"),
            }
        }
        bound
    }

    /// Returns `true` if a submarine with this id exists.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the submarine with this id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Submarine> {
        self.index.get(id).map(|&slot| &self.submarines[slot])
    }

    /// Returns the submarine with this id mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Submarine> {
        let slot = *self.index.get(id)?;
        self.submarines.get_mut(slot)
    }

    /// Like [`get`](Self::get) but with a typed error.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::UnknownEntity`] if no such submarine exists.
    pub fn require(&self, id: &str) -> Result<&Submarine, FleetError> {
        self.get(id)
            .ok_or_else(|| FleetError::UnknownEntity(EntityId::new(id)))
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Submarine> + '_ {
        self.submarines.iter()
    }

    /// Iterates mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Submarine> + '_ {
        self.submarines.iter_mut()
    }

    /// All submarines as a slice, in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Submarine] {
        &self.submarines
    }

    /// All submarines as a mutable slice. Ids cannot be changed through it,
    /// so the index stays valid.
    pub fn as_mut_slice(&mut self) -> &mut [Submarine] {
        &mut self.submarines
    }

    /// Iterates submarines that have not been destroyed.
    pub fn active(&self) -> impl Iterator<Item = &Submarine> + '_ {
        self.submarines.iter().filter(|s| s.is_active())
    }

    /// Number of submarines that have not been destroyed.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.submarines.iter().map(|s| s.id().clone()).collect()
    }

    /// Number of submarines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.submarines.len()
    }

    /// Returns `true` if the fleet is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.submarines.is_empty()
    }

    /// Snapshots every submarine in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SubmarineSnapshot> {
        self.submarines.iter().map(Submarine::snapshot).collect()
    }
}

impl<'a> IntoIterator for &'a Fleet {
    type Item = &'a Submarine;
    type IntoIter = std::slice::Iter<'a, Submarine>;

    fn into_iter(self) -> Self::IntoIter {
        self.submarines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::stream::{stream_of, ScriptedSource};

    mod fleet_tests {
        use super::*;

        #[test]
        fn new_creates_empty_fleet() {
            let fleet = Fleet::new();
            assert!(fleet.is_empty());
            assert_eq!(fleet.len(), 0);
            assert_eq!(fleet.active_count(), 0);
        }

        #[test]
        fn spawn_keeps_insertion_order() {
            let mut fleet = Fleet::new();
            fleet.spawn("C", IVec2::ZERO).unwrap();
            fleet.spawn("A", IVec2::ZERO).unwrap();
            fleet.spawn("B", IVec2::ZERO).unwrap();
            let ids: Vec<_> = fleet.iter().map(|s| s.id().to_string()).collect();
            assert_eq!(ids, ["C", "A", "B"]);
        }

        #[test]
        fn spawn_rejects_duplicates() {
            let mut fleet = Fleet::new();
            fleet.spawn("A", IVec2::ZERO).unwrap();
            let err = fleet.spawn("A", IVec2::ONE).unwrap_err();
            assert_eq!(err, FleetError::DuplicateEntity(EntityId::new("A")));
            assert_eq!(fleet.len(), 1);
            assert_eq!(fleet.get("A").unwrap().position(), IVec2::ZERO);
        }

        #[test]
        fn get_and_get_mut() {
            let mut fleet = Fleet::new();
            fleet.spawn("A", IVec2::new(1, 2)).unwrap();
            assert_eq!(fleet.get("A").unwrap().position(), IVec2::new(1, 2));
            assert!(fleet.get("missing").is_none());

            fleet
                .get_mut("A")
                .unwrap()
                .apply_command(Command::forward(1))
                .unwrap();
            assert_eq!(fleet.get("A").unwrap().position(), IVec2::new(2, 2));
        }

        #[test]
        fn require_reports_unknown_entity() {
            let fleet = Fleet::new();
            assert_eq!(
                fleet.require("X").unwrap_err(),
                FleetError::UnknownEntity(EntityId::new("X"))
            );
        }

        #[test]
        fn active_excludes_destroyed() {
            let mut fleet = Fleet::new();
            fleet.spawn("A", IVec2::ZERO).unwrap();
            fleet.spawn("B", IVec2::ZERO).unwrap();
            fleet.get_mut("A").unwrap().destroy();
            let active: Vec<_> = fleet.active().map(|s| s.id().to_string()).collect();
            assert_eq!(active, ["B"]);
            assert_eq!(fleet.len(), 2);
        }

        #[test]
        fn snapshot_follows_insertion_order() {
            let mut fleet = Fleet::new();
            fleet.spawn("B", IVec2::ZERO).unwrap();
            fleet.spawn("A", IVec2::ONE).unwrap();
            let snap = fleet.snapshot();
            assert_eq!(snap[0].id, EntityId::new("B"));
            assert_eq!(snap[1].position, IVec2::ONE);
        }
    }

    mod loading_tests {
        use super::*;

        #[test]
        fn from_source_binds_streams() {
            let source = ScriptedSource::new()
                .with_script("A", vec![Command::up(1)])
                .with_missing("B");
            let fleet = Fleet::from_source(&source);
            assert_eq!(fleet.ids(), vec![EntityId::new("A"), EntityId::new("B")]);
            assert!(fleet.get("A").unwrap().is_bound());
            assert!(!fleet.get("B").unwrap().is_bound());
            assert!(fleet.iter().all(|s| s.position() == IVec2::ZERO));
        }

        struct Repeating;

        impl CommandSource for Repeating {
            fn entity_ids(&self) -> Vec<EntityId> {
                vec![EntityId::new("A"), EntityId::new("A")]
            }

            fn open(&self, _id: &EntityId) -> Option<CommandStream> {
                Some(stream_of(vec![Command::up(1)]))
            }
        }

        #[test]
        fn from_source_skips_duplicate_ids() {
            let fleet = Fleet::from_source(&Repeating);
            assert_eq!(fleet.len(), 1);
        }

        #[test]
        fn attach_streams_skips_unknown_ids() {
            let mut fleet = Fleet::new();
            fleet.spawn("A", IVec2::ZERO).unwrap();
            let bound = fleet.attach_streams(vec![
                (EntityId::new("A"), stream_of(vec![Command::up(1)])),
                (EntityId::new("ghost"), stream_of(vec![Command::up(1)])),
            ]);
            assert_eq!(bound, 1);
            assert!(fleet.get("A").unwrap().is_bound());
            assert!(!fleet.contains(&EntityId::new("ghost")));
        }

        #[test]
        fn bind_unknown_entity_fails() {
            let mut fleet = Fleet::new();
            let err = fleet.bind("nobody", stream_of(Vec::new())).unwrap_err();
            assert!(matches!(err, FleetError::UnknownEntity(_)));
        }
    }
}
