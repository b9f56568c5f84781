//! Secret keys and activation codes.
//!
//! Both files hold `ID:VALUE` lines. Blank lines are ignored; lines without a
//! separator or with an empty side are warned about and skipped.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use subfleet_core::EntityId;
use tracing::{info, warn};

use crate::error::DataError;
use crate::layout::DataLayout;

/// Per-entity secrets loaded from `Secrets/`.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    secret_keys: HashMap<EntityId, String>,
    activation_codes: HashMap<EntityId, String>,
}

impl SecretStore {
    /// Loads both secrets files.
    ///
    /// # Errors
    ///
    /// Returns a [`DataError`] if either file is missing or unreadable.
    pub fn load(layout: &DataLayout) -> Result<Self, DataError> {
        let secret_keys = read_entries(&layout.secret_key_file())?;
        let activation_codes = read_entries(&layout.activation_codes_file())?;
        info!(
            secret_keys = secret_keys.len(),
            activation_codes = activation_codes.len(),
            "secrets loaded"
        );
        Ok(Self {
            secret_keys,
            activation_codes,
        })
    }

    /// Builds a store from in-memory `(id, secret, code)` triples.
    #[must_use]
    pub fn from_triples<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let mut store = Self::default();
        for (id, secret, code) in entries {
            store.secret_keys.insert(EntityId::new(id), secret.to_string());
            store
                .activation_codes
                .insert(EntityId::new(id), code.to_string());
        }
        store
    }

    /// Secret key for `id`.
    #[must_use]
    pub fn secret_key(&self, id: &EntityId) -> Option<&str> {
        self.secret_keys.get(id).map(String::as_str)
    }

    /// Activation code for `id`.
    #[must_use]
    pub fn activation_code(&self, id: &EntityId) -> Option<&str> {
        self.activation_codes.get(id).map(String::as_str)
    }

    /// `(secret, code)` if both are on file.
    #[must_use]
    pub fn credentials(&self, id: &EntityId) -> Option<(&str, &str)> {
        Some((self.secret_key(id)?, self.activation_code(id)?))
    }

    /// Number of entities with a secret key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secret_keys.len()
    }

    /// Returns `true` if no secret keys are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret_keys.is_empty()
    }
}

fn read_entries(path: &Path) -> Result<HashMap<EntityId, String>, DataError> {
    let text = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
    Ok(parse_entries(&text, path))
}

fn parse_entries(text: &str, source: &Path) -> HashMap<EntityId, String> {
    let mut entries = HashMap::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((id, value)) = line.split_once(':') else {
            warn!(file = %source.display(), line = index + 1, "secrets line has no `:` separator");
            continue;
        };
        let (id, value) = (id.trim(), value.trim());
        if id.is_empty() || value.is_empty() {
            warn!(file = %source.display(), line = index + 1, "secrets line has an empty id or value");
            continue;
        }
        if entries
            .insert(EntityId::new(id), value.to_string())
            .is_some()
        {
            warn!(file = %source.display(), entity = id, "duplicate secrets entry; last one wins");
        }
    }
    entries
}
