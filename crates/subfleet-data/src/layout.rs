//! Data directory layout.
//!
//! ```text
//! <root>/
//!   MovementReports/<ID>.txt
//!   SensorData/<ID>.txt
//!   Secrets/SecretKEY.txt
//!   Secrets/ActivationCodes.txt
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use subfleet_core::EntityId;

use crate::error::DataError;

/// Default cap on valid moves read from a single movement report.
pub const DEFAULT_MAX_LINES: usize = 10_000;

const MOVEMENT_DIR: &str = "MovementReports";
const SENSOR_DIR: &str = "SensorData";
const SECRETS_DIR: &str = "Secrets";
const SECRET_KEY_FILE: &str = "SecretKEY.txt";
const ACTIVATION_CODES_FILE: &str = "ActivationCodes.txt";

/// Paths of every input under a data root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLayout {
    /// Root directory
    pub root: PathBuf,
    /// Maximum valid moves read per movement report
    pub max_lines: usize,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl DataLayout {
    /// Layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Overrides the per-report move cap.
    #[must_use]
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// Checks that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// [`DataError::MissingFile`] if the root does not exist,
    /// [`DataError::NotADirectory`] if it is a file.
    pub fn validate(&self) -> Result<(), DataError> {
        let meta = fs::metadata(&self.root).map_err(|e| DataError::io(&self.root, e))?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(DataError::NotADirectory(self.root.clone()))
        }
    }

    /// `MovementReports/`
    #[must_use]
    pub fn movement_dir(&self) -> PathBuf {
        self.root.join(MOVEMENT_DIR)
    }

    /// `SensorData/`
    #[must_use]
    pub fn sensor_dir(&self) -> PathBuf {
        self.root.join(SENSOR_DIR)
    }

    /// `Secrets/`
    #[must_use]
    pub fn secrets_dir(&self) -> PathBuf {
        self.root.join(SECRETS_DIR)
    }

    /// Movement report for `id`.
    #[must_use]
    pub fn movement_file(&self, id: &EntityId) -> PathBuf {
        self.movement_dir().join(format!("{id}.txt"))
    }

    /// Sensor log for `id`.
    #[must_use]
    pub fn sensor_file(&self, id: &EntityId) -> PathBuf {
        self.sensor_dir().join(format!("{id}.txt"))
    }

    /// `Secrets/SecretKEY.txt`
    #[must_use]
    pub fn secret_key_file(&self) -> PathBuf {
        self.secrets_dir().join(SECRET_KEY_FILE)
    }

    /// `Secrets/ActivationCodes.txt`
    #[must_use]
    pub fn activation_codes_file(&self) -> PathBuf {
        self.secrets_dir().join(ACTIVATION_CODES_FILE)
    }
}

/// Stems of the `*.txt` files in `dir`, sorted by name.
pub(crate) fn txt_stems(dir: &Path) -> Result<Vec<EntityId>, DataError> {
    let meta = fs::metadata(dir).map_err(|e| DataError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(DataError::NotADirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|e| DataError::io(dir, e))?;
    let mut stems = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DataError::io(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(EntityId::new(stem));
        }
    }
    stems.sort();
    Ok(stems)
}
