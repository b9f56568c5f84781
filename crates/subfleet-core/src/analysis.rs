//! Distance analysis over active contacts.

use serde::{Deserialize, Serialize};

use crate::entity::{Contact, EntityId};

/// Straight-line distance between two contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDistance {
    /// First contact, in input order
    pub a: EntityId,
    /// Second contact, in input order
    pub b: EntityId,
    /// Euclidean distance between their cells
    pub distance: f64,
}

/// The closest and the farthest pair of active contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceExtremes {
    /// Closest pair
    pub nearest: PairDistance,
    /// Farthest pair
    pub farthest: PairDistance,
}

/// Finds the nearest and farthest pair among active contacts.
///
/// Returns `None` with fewer than two active contacts. Ties keep the pair
/// seen first in input order.
#[must_use]
pub fn distance_extremes<C: Contact>(contacts: &[C]) -> Option<DistanceExtremes> {
    let active: Vec<&C> = contacts.iter().filter(|c| c.is_active()).collect();
    let mut nearest: Option<(usize, usize, f64)> = None;
    let mut farthest: Option<(usize, usize, f64)> = None;

    for (i, a) in active.iter().enumerate() {
        for (j, b) in active.iter().enumerate().skip(i + 1) {
            let distance = a.position().as_dvec2().distance(b.position().as_dvec2());
            if nearest.map_or(true, |(_, _, best)| distance < best) {
                nearest = Some((i, j, distance));
            }
            if farthest.map_or(true, |(_, _, best)| distance > best) {
                farthest = Some((i, j, distance));
            }
        }
    }

    let pair = |(i, j, distance): (usize, usize, f64)| PairDistance {
        a: active[i].id().clone(),
        b: active[j].id().clone(),
        distance,
    };
    Some(DistanceExtremes {
        nearest: pair(nearest?),
        farthest: pair(farthest?),
    })
}
