//! SHA-256 activation proofs.
//!
//! A proof is the lowercase hex SHA-256 of `date ‖ secret ‖ activation_code`,
//! with the date written as `YYYY-MM-DD`. Proofs change every day.

use std::fmt::Write;

use sha2::{Digest, Sha256};
use subfleet_core::{CredentialCheck, CredentialError, EntityId, ReferenceDate};
use tracing::debug;

use crate::secrets::SecretStore;

/// Lowercase hex digest of `date ‖ secret ‖ code`.
#[must_use]
pub fn digest(date: ReferenceDate, secret: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(code.as_bytes());
    let bytes = hasher.finalize();

    let mut out = String::with_capacity(64);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// [`CredentialCheck`] backed by a [`SecretStore`].
#[derive(Debug, Clone)]
pub struct DigestVerifier {
    store: SecretStore,
}

impl DigestVerifier {
    /// Verifies proofs against `store`.
    #[must_use]
    pub fn new(store: SecretStore) -> Self {
        Self { store }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    /// Issues the proof for `entity` on `date`.
    ///
    /// # Errors
    ///
    /// [`CredentialError::MissingCredential`] if the secret or code is absent.
    pub fn proof_for(&self, entity: &EntityId, date: ReferenceDate) -> Result<String, CredentialError> {
        let (secret, code) = self
            .store
            .credentials(entity)
            .ok_or_else(|| CredentialError::MissingCredential(entity.clone()))?;
        Ok(digest(date, secret, code))
    }
}

impl CredentialCheck for DigestVerifier {
    fn verify(
        &self,
        entity: &EntityId,
        proof: &str,
        date: ReferenceDate,
    ) -> Result<(), CredentialError> {
        let expected = self.proof_for(entity, date)?;
        let supplied = proof.trim().to_ascii_lowercase();
        if constant_time_eq(expected.as_bytes(), supplied.as_bytes()) {
            debug!(%entity, %date, "activation proof verified");
            Ok(())
        } else {
            debug!(%entity, %date, "activation proof rejected");
            Err(CredentialError::VerificationFailed(entity.clone()))
        }
    }
}
