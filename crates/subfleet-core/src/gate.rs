//! Activation gate for the destructive action.
//!
//! Two independent checks must both pass before activation is allowed:
//!
//! 1. **Safety veto**: every lane of the target's fire-control report is
//!    safe. One unsafe lane vetoes, whichever it is.
//! 2. **Credential check**: an injected [`CredentialCheck`] accepts the
//!    caller's proof for the target and reference date.
//!
//! Both checks are always evaluated so the decision lists every reason for a
//! denial. The gate never mutates fleet state.

use std::fmt;
use std::str::FromStr;

use glam::IVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::Direction;
use crate::entity::{Contact, EntityId};
use crate::error::FleetError;
use crate::fire_control::{self, FireControlReport};

// =============================================================================
// Reference date
// =============================================================================

/// Errors raised while parsing a [`ReferenceDate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// The text is not shaped like `YYYY-MM-DD`.
    #[error("expected a date as YYYY-MM-DD, got `{0}`")]
    Format(String),

    /// The month or day does not exist.
    #[error("no such calendar date `{0}`")]
    OutOfRange(String),
}

/// A calendar date used as input to credential proofs.
///
/// Displays as zero-padded `YYYY-MM-DD`, which is the exact text fed into
/// proof digests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceDate {
    year: u16,
    month: u8,
    day: u8,
}

impl ReferenceDate {
    /// Creates a date after validating month and day.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::OutOfRange`] for dates that do not exist.
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, DateError> {
        let valid = (1..=12).contains(&month) && day >= 1 && day <= days_in_month(year, month);
        if valid {
            Ok(Self { year, month, day })
        } else {
            Err(DateError::OutOfRange(format!("{year:04}-{month:02}-{day:02}")))
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> u16 {
        self.year
    }

    /// Month, 1 to 12.
    #[must_use]
    pub const fn month(self) -> u8 {
        self.month
    }

    /// Day of month, starting at 1.
    #[must_use]
    pub const fn day(self) -> u8 {
        self.day
    }
}

const fn is_leap(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl FromStr for ReferenceDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_error = || DateError::Format(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(format_error());
        }
        let digits = |range: std::ops::Range<usize>| -> Result<u16, DateError> {
            let part = &s[range];
            if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().map_err(|_| format_error())
            } else {
                Err(format_error())
            }
        };
        let year = digits(0..4)?;
        let month = u8::try_from(digits(5..7)?).map_err(|_| format_error())?;
        let day = u8::try_from(digits(8..10)?).map_err(|_| format_error())?;
        Self::new(year, month, day).map_err(|_| DateError::OutOfRange(s.to_string()))
    }
}

impl fmt::Display for ReferenceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl TryFrom<String> for ReferenceDate {
    type Error = DateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferenceDate> for String {
    fn from(date: ReferenceDate) -> Self {
        date.to_string()
    }
}

// =============================================================================
// Credential check
// =============================================================================

/// Why the external credential check refused a proof.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CredentialError {
    /// No secret or activation code is on file for the entity.
    #[error("no credentials on file for `{0}`")]
    MissingCredential(EntityId),

    /// The proof does not match.
    #[error("proof for `{0}` did not verify")]
    VerificationFailed(EntityId),
}

/// External credential/activation-code check.
///
/// Implementations are treated as opaque pass/fail by the gate.
pub trait CredentialCheck: Send + Sync {
    /// Verifies `proof` for `entity` on `date`.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] describing the refusal.
    fn verify(&self, entity: &EntityId, proof: &str, date: ReferenceDate)
        -> Result<(), CredentialError>;
}

impl<T: CredentialCheck + ?Sized> CredentialCheck for &T {
    fn verify(
        &self,
        entity: &EntityId,
        proof: &str,
        date: ReferenceDate,
    ) -> Result<(), CredentialError> {
        (**self).verify(entity, proof, date)
    }
}

impl<T: CredentialCheck + ?Sized> CredentialCheck for Box<T> {
    fn verify(
        &self,
        entity: &EntityId,
        proof: &str,
        date: ReferenceDate,
    ) -> Result<(), CredentialError> {
        (**self).verify(entity, proof, date)
    }
}

// =============================================================================
// Decision
// =============================================================================

/// One reason activation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Denial {
    /// A contact lies along `direction`.
    UnsafeLane {
        /// The unsafe lane
        direction: Direction,
        /// Position of the nearest contact on it
        position: IVec2,
    },
    /// The target has been destroyed.
    TargetDestroyed,
    /// The credential check refused the proof.
    Credential(CredentialError),
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsafeLane {
                direction,
                position,
            } => write!(
                f,
                "{direction} lane blocked by contact at ({}, {})",
                position.x, position.y
            ),
            Self::TargetDestroyed => f.write_str("target destroyed"),
            Self::Credential(err) => write!(f, "{err}"),
        }
    }
}

/// Outcome of [`ActivationGate::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationDecision {
    /// The entity activation was requested for
    pub target: EntityId,
    /// Reference date of the proof
    pub date: ReferenceDate,
    /// The fire-control report the veto was based on
    pub report: FireControlReport,
    /// Every reason for refusal; empty when allowed
    pub denials: Vec<Denial>,
}

impl ActivationDecision {
    /// Activation is allowed only if no check refused it.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.denials.is_empty()
    }

    /// Lanes that vetoed activation.
    #[must_use]
    pub fn unsafe_directions(&self) -> Vec<Direction> {
        self.denials
            .iter()
            .filter_map(|denial| match denial {
                Denial::UnsafeLane { direction, .. } => Some(*direction),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if the credential check accepted the proof.
    #[must_use]
    pub fn credential_passed(&self) -> bool {
        !self
            .denials
            .iter()
            .any(|denial| matches!(denial, Denial::Credential(_)))
    }
}

/// Combines the fire-control veto with an injected credential check.
#[derive(Debug, Clone)]
pub struct ActivationGate<C> {
    credentials: C,
}

impl<C: CredentialCheck> ActivationGate<C> {
    /// Creates a gate around a credential check.
    pub const fn new(credentials: C) -> Self {
        Self { credentials }
    }

    /// The wrapped credential check.
    pub const fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Decides whether activation of `target` is allowed.
    ///
    /// If `report` is `None` a fresh scan is taken from `contacts`.
    ///
    /// # Errors
    ///
    /// - [`FleetError::UnknownEntity`] if `target` is not among `contacts`
    /// - [`FleetError::ReportMismatch`] if `report` was computed for another shooter
    pub fn evaluate<T: Contact>(
        &self,
        contacts: &[T],
        target: &str,
        report: Option<&FireControlReport>,
        proof: &str,
        date: ReferenceDate,
    ) -> Result<ActivationDecision, FleetError> {
        let contact = contacts
            .iter()
            .find(|c| c.id().as_str() == target)
            .ok_or_else(|| FleetError::UnknownEntity(EntityId::new(target)))?;
        let id = contact.id().clone();

        let report = match report {
            Some(report) if report.shooter.as_ref() == Some(&id) => report.clone(),
            Some(report) => {
                return Err(FleetError::ReportMismatch {
                    expected: id,
                    found: report
                        .shooter
                        .as_ref()
                        .map_or_else(|| "-".to_string(), ToString::to_string),
                });
            }
            None => fire_control::scan(contacts, target)?,
        };

        let mut denials = Vec::new();
        if !contact.is_active() {
            denials.push(Denial::TargetDestroyed);
        }
        for lane in &report.lanes {
            if let Some(sighting) = &lane.nearest {
                denials.push(Denial::UnsafeLane {
                    direction: lane.direction,
                    position: sighting.position,
                });
            }
        }
        if let Err(err) = self.credentials.verify(&id, proof, date) {
            denials.push(Denial::Credential(err));
        }

        Ok(ActivationDecision {
            target: id,
            date,
            report,
            denials,
        })
    }
}
