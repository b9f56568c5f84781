//! Status components attached to each submarine.
//!
//! Destruction and stream exhaustion are independent states: a submarine can
//! run out of commands and still be a live contact, and a destroyed submarine
//! may still have unread commands that will never be pulled.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Lifecycle flags for a submarine.
    ///
    /// An empty set means the submarine is active and may still have commands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct StatusFlags: u8 {
        /// Removed by a collision. Never cleared.
        const DESTROYED = 1;
        /// The command cursor reached the end of its stream.
        const EXHAUSTED = 1 << 1;
    }
}

impl StatusFlags {
    /// Returns `true` if the submarine has not been destroyed.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.contains(Self::DESTROYED)
    }

    /// Short label used in tables and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        if self.contains(Self::DESTROYED) {
            "destroyed"
        } else if self.contains(Self::EXHAUSTED) {
            "idle"
        } else {
            "active"
        }
    }
}
