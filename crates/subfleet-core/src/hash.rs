//! State hashing for determinism verification.
//!
//! Two fleets driven by identical command streams must produce identical
//! hashes, whichever scheduling model stepped them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::collision::Collision;
use crate::entity::Submarine;
use crate::fleet::Fleet;

/// Computes a deterministic hash of fleet state.
///
/// This hash includes, per submarine in fleet order:
/// - id and position
/// - status flags
/// - full move history
#[must_use]
pub fn hash_fleet(fleet: &Fleet) -> u64 {
    let mut hasher = DefaultHasher::new();
    fleet.len().hash(&mut hasher);
    for submarine in fleet {
        hash_submarine(submarine, &mut hasher);
    }
    hasher.finish()
}

/// Hashes a fleet together with its collision log.
#[must_use]
pub fn hash_run(fleet: &Fleet, collisions: &[Collision]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_fleet(fleet).hash(&mut hasher);
    collisions.hash(&mut hasher);
    hasher.finish()
}

fn hash_submarine<H: Hasher>(submarine: &Submarine, hasher: &mut H) {
    submarine.id().hash(hasher);
    submarine.position().x.hash(hasher);
    submarine.position().y.hash(hasher);
    submarine.status().bits().hash(hasher);
    submarine.history().hash(hasher);
}
