//! Simulation configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How submarines are stepped within a round.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheduling {
    /// One thread steps every submarine in fleet order.
    #[default]
    Sequential,
    /// Submarines step on the rayon pool; the round waits for all of them
    /// before collision detection.
    Parallel,
}

/// Configuration for a [`Simulation`](crate::simulation::Simulation).
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```
/// use subfleet_core::config::{Scheduling, SimulationConfig};
///
/// let config = SimulationConfig::from_json_str(r#"{ "scheduling": "parallel" }"#).unwrap();
/// assert_eq!(config.scheduling, Scheduling::Parallel);
/// assert_eq!(config.round_delay_ms, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Stepping model
    pub scheduling: Scheduling,
    /// Pause between rounds in milliseconds; affects pacing only
    pub round_delay_ms: u64,
    /// Stop after this many rounds even if commands remain
    pub max_rounds: Option<u64>,
}

impl SimulationConfig {
    /// Sequential stepping, no delay, no cap.
    #[must_use]
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Parallel stepping, no delay, no cap.
    #[must_use]
    pub fn parallel() -> Self {
        Self {
            scheduling: Scheduling::Parallel,
            ..Self::default()
        }
    }

    /// Sets the pause between rounds.
    #[must_use]
    pub fn with_round_delay(mut self, delay: Duration) -> Self {
        self.round_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Caps the number of rounds.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u64) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// The pause between rounds.
    #[must_use]
    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }

    /// Parses a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid JSON or unknown values.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if its content is invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
