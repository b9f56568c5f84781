//! Directional fire-control scan.
//!
//! For a shooter, each of the three [`Direction`] lanes is scanned for the
//! nearest active contact lying strictly along that lane:
//!
//! | Lane      | Candidates                              | Distance          |
//! |-----------|-----------------------------------------|-------------------|
//! | `up`      | same `x`, smaller `y`                   | `shooter.y - y`   |
//! | `down`    | same `x`, larger `y`                    | `y - shooter.y`   |
//! | `forward` | same `y`, larger `x`                    | `x - shooter.x`   |
//!
//! A lane with no candidate is safe. The scan is read-only and may run on the
//! live fleet or on any snapshot.
//!
//! Ties keep the contact that appears first in the input.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::command::Direction;
use crate::entity::{Contact, EntityId};
use crate::error::FleetError;

/// The nearest contact found on a lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    /// Contact id
    pub id: EntityId,
    /// Contact position
    pub position: IVec2,
    /// Distance along the lane
    pub distance: u64,
}

/// Result for a single lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneReport {
    /// The scanned direction
    pub direction: Direction,
    /// Nearest contact on the lane, if any
    pub nearest: Option<Sighting>,
}

impl LaneReport {
    /// A lane is safe when nothing lies along it.
    #[must_use]
    pub const fn is_safe(&self) -> bool {
        self.nearest.is_none()
    }

    /// Position of the nearest contact, if any.
    #[must_use]
    pub fn nearest_position(&self) -> Option<IVec2> {
        self.nearest.as_ref().map(|s| s.position)
    }
}

/// Per-direction safety verdict for one shooter position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireControlReport {
    /// Shooter id, or `None` for an external reference point
    pub shooter: Option<EntityId>,
    /// Position the lanes were scanned from
    pub origin: IVec2,
    /// One report per direction, in [`Direction::ALL`] order
    pub lanes: [LaneReport; 3],
}

impl FireControlReport {
    /// Report for one direction.
    #[must_use]
    pub fn lane(&self, direction: Direction) -> &LaneReport {
        &self.lanes[direction.index()]
    }

    /// Returns `true` if nothing lies along `direction`.
    #[must_use]
    pub fn is_safe(&self, direction: Direction) -> bool {
        self.lane(direction).is_safe()
    }

    /// Returns `true` if every lane is safe.
    #[must_use]
    pub fn all_clear(&self) -> bool {
        self.lanes.iter().all(LaneReport::is_safe)
    }

    /// Directions with a contact, in canonical order.
    #[must_use]
    pub fn unsafe_directions(&self) -> Vec<Direction> {
        self.lanes
            .iter()
            .filter(|lane| !lane.is_safe())
            .map(|lane| lane.direction)
            .collect()
    }
}

/// Scans all lanes from the position of `shooter`.
///
/// The shooter itself is never a candidate.
///
/// # Errors
///
/// Returns [`FleetError::UnknownEntity`] if no contact has the shooter's id.
pub fn scan<C: Contact>(contacts: &[C], shooter: &str) -> Result<FireControlReport, FleetError> {
    let origin = contacts
        .iter()
        .find(|c| c.id().as_str() == shooter)
        .ok_or_else(|| FleetError::UnknownEntity(EntityId::new(shooter)))?;
    let id = origin.id().clone();
    let mut report = scan_from(contacts, origin.position(), Some(&id));
    report.shooter = Some(id);
    Ok(report)
}

/// Scans all lanes from an arbitrary `origin`.
///
/// `exclude` removes one contact from candidacy (the shooter, when the
/// origin belongs to a fleet member). Destroyed contacts are never
/// candidates.
#[must_use]
pub fn scan_from<C: Contact>(
    contacts: &[C],
    origin: IVec2,
    exclude: Option<&EntityId>,
) -> FireControlReport {
    let mut nearest: [Option<Sighting>; 3] = [None, None, None];

    for contact in contacts {
        if !contact.is_active() || exclude.is_some_and(|id| id == contact.id()) {
            continue;
        }
        let position = contact.position();
        for direction in Direction::ALL {
            let Some(distance) = direction.distance_along(origin, position) else {
                continue;
            };
            let slot = &mut nearest[direction.index()];
            if slot.as_ref().map_or(true, |best| distance < best.distance) {
                *slot = Some(Sighting {
                    id: contact.id().clone(),
                    position,
                    distance,
                });
            }
        }
    }

    let [up, down, forward] = nearest;
    FireControlReport {
        shooter: None,
        origin,
        lanes: [
            LaneReport {
                direction: Direction::Up,
                nearest: up,
            },
            LaneReport {
                direction: Direction::Down,
                nearest: down,
            },
            LaneReport {
                direction: Direction::Forward,
                nearest: forward,
            },
        ],
    }
}
