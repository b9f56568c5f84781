//! Collision detection for submarines sharing a grid cell.
//!
//! The `CollisionDetector` handles one destructive rule: every active
//! submarine in a cell occupied by two or more active submarines is
//! destroyed, not just the first pair seen.
//!
//! # Deduplication
//!
//! The detector owns the lifetime collision log. A given unordered pair at a
//! given position is reported at most once, no matter how often `check` runs.
//!
//! # Ordering
//!
//! Cells are visited in the order their first occupant appears in the input,
//! and pairs within a cell are emitted as `(i, j)` with `i < j` in input
//! order. The same input order therefore always yields the same output.

use std::collections::{HashMap, HashSet};
use std::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Submarine};

/// An unordered pair of submarines that met at `position`.
///
/// The ids are stored in canonical (sorted) order, so `(A, B)` and `(B, A)`
/// at the same cell are the same collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collision {
    first: EntityId,
    second: EntityId,
    position: IVec2,
}

impl Collision {
    /// Creates a collision record, canonicalizing the id order.
    #[must_use]
    pub fn new(a: EntityId, b: EntityId, position: IVec2) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first,
            second,
            position,
        }
    }

    /// The pair's ids in canonical order.
    #[must_use]
    pub fn ids(&self) -> (&EntityId, &EntityId) {
        (&self.first, &self.second)
    }

    /// Cell where the collision happened.
    #[must_use]
    pub const fn position(&self) -> IVec2 {
        self.position
    }

    /// Returns `true` if `id` is one of the pair.
    #[must_use]
    pub fn involves(&self, id: &str) -> bool {
        self.first.as_str() == id || self.second.as_str() == id
    }
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} at ({}, {})",
            self.first, self.second, self.position.x, self.position.y
        )
    }
}

/// Finds co-located active submarines and keeps the lifetime collision log.
#[derive(Debug, Clone, Default)]
pub struct CollisionDetector {
    seen: HashSet<Collision>,
    log: Vec<Collision>,
}

impl CollisionDetector {
    /// Creates a detector with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups active submarines by cell, destroys every member of a shared
    /// cell and returns the collisions not reported before.
    ///
    /// Destroyed submarines are excluded before grouping, so they can never
    /// be revived or collide again.
    pub fn check(&mut self, submarines: &mut [Submarine]) -> Vec<Collision> {
        let mut cells: Vec<(IVec2, Vec<usize>)> = Vec::new();
        let mut by_position: HashMap<(i32, i32), usize> = HashMap::new();

        for (slot, submarine) in submarines.iter().enumerate() {
            if !submarine.is_active() {
                continue;
            }
            let position = submarine.position();
            let cell = *by_position
                .entry((position.x, position.y))
                .or_insert_with(|| {
                    cells.push((position, Vec::new()));
                    cells.len() - 1
                });
            cells[cell].1.push(slot);
        }

        let mut fresh = Vec::new();
        for (position, members) in cells.iter().filter(|(_, members)| members.len() > 1) {
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    let collision = Collision::new(
                        submarines[a].id().clone(),
                        submarines[b].id().clone(),
                        *position,
                    );
                    if self.seen.insert(collision.clone()) {
                        self.log.push(collision.clone());
                        fresh.push(collision);
                    }
                }
            }
            for &slot in members {
                submarines[slot].destroy();
            }
            tracing::debug!(
                x = position.x,
                y = position.y,
                destroyed = members.len(),
                "submarines collided"
            );
        }
        fresh
    }

    /// Every collision reported so far, in report order.
    #[must_use]
    pub fn log(&self) -> &[Collision] {
        &self.log
    }

    /// Number of collisions reported so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Returns `true` if no collision has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Returns `true` if this pair at this position was already reported.
    #[must_use]
    pub fn contains(&self, collision: &Collision) -> bool {
        self.seen.contains(collision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: &str, x: i32, y: i32) -> Submarine {
        Submarine::at(EntityId::new(id), IVec2::new(x, y))
    }

    fn pair(a: &str, b: &str, x: i32, y: i32) -> Collision {
        Collision::new(EntityId::new(a), EntityId::new(b), IVec2::new(x, y))
    }

    #[test]
    fn collision_ids_are_canonical() {
        assert_eq!(pair("B", "A", 1, 1), pair("A", "B", 1, 1));
        let c = pair("Z", "M", 0, 0);
        assert_eq!(c.ids().0.as_str(), "M");
        assert!(c.involves("Z"));
        assert!(!c.involves("A"));
    }

    #[test]
    fn display_names_both_ids_and_cell() {
        assert_eq!(pair("A", "B", 5, 0).to_string(), "A x B at (5, 0)");
    }

    #[test]
    fn no_collision_for_distinct_cells() {
        let mut subs = vec![at("A", 0, 0), at("B", 1, 0), at("C", 0, 1)];
        let mut detector = CollisionDetector::new();
        assert!(detector.check(&mut subs).is_empty());
        assert!(subs.iter().all(Submarine::is_active));
        assert!(detector.is_empty());
    }

    #[test]
    fn head_to_head_destroys_both() {
        let mut subs = vec![at("A", 5, 0), at("B", 5, 0), at("C", 6, 0)];
        let mut detector = CollisionDetector::new();
        let found = detector.check(&mut subs);
        assert_eq!(found, vec![pair("A", "B", 5, 0)]);
        assert!(!subs[0].is_active());
        assert!(!subs[1].is_active());
        assert!(subs[2].is_active());
    }

    #[test]
    fn pile_up_destroys_all_and_emits_every_pair() {
        let mut subs = vec![at("C", 2, 2), at("A", 2, 2), at("B", 2, 2)];
        let mut detector = CollisionDetector::new();
        let found = detector.check(&mut subs);
        assert_eq!(
            found,
            vec![pair("A", "C", 2, 2), pair("B", "C", 2, 2), pair("A", "B", 2, 2)]
        );
        assert!(subs.iter().all(|s| !s.is_active()));
    }

    #[test]
    fn cells_are_visited_in_first_seen_order() {
        let mut subs = vec![
            at("P", 9, 9),
            at("A", 1, 1),
            at("Q", 9, 9),
            at("B", 1, 1),
        ];
        let mut detector = CollisionDetector::new();
        let found = detector.check(&mut subs);
        assert_eq!(found, vec![pair("P", "Q", 9, 9), pair("A", "B", 1, 1)]);
    }

    #[test]
    fn repeated_check_reports_once() {
        let mut subs = vec![at("A", 0, 0), at("B", 0, 0)];
        let mut detector = CollisionDetector::new();
        assert_eq!(detector.check(&mut subs).len(), 1);
        assert!(detector.check(&mut subs).is_empty());
        assert_eq!(detector.len(), 1);
    }

    #[test]
    fn inactive_submarines_are_ignored() {
        let mut subs = vec![at("A", 0, 0), at("B", 0, 0)];
        subs[0].destroy();
        let mut detector = CollisionDetector::new();
        assert!(detector.check(&mut subs).is_empty());
        assert!(subs[1].is_active());
    }

    #[test]
    fn known_pair_still_destroys_on_repeat_meeting() {
        let mut detector = CollisionDetector::new();
        let mut first = vec![at("A", 0, 0), at("B", 0, 0)];
        detector.check(&mut first);

        let mut again = vec![at("A", 0, 0), at("B", 0, 0)];
        assert!(detector.check(&mut again).is_empty());
        assert!(again.iter().all(|s| !s.is_active()));
        assert!(detector.contains(&pair("B", "A", 0, 0)));
    }

    #[test]
    fn collision_serializes() {
        let c = pair("A", "B", -1, 3);
        let json = serde_json::to_string(&c).unwrap();
        let back: Collision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
