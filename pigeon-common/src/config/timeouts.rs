//! Server-side session timeouts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts applied to every session a listener spawns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimeouts {
    /// How long the server waits for the next frame from the client.
    ///
    /// Default: 300 seconds (5 minutes)
    #[serde(default = "defaults::command_secs")]
    pub command_secs: u64,

    /// Maximum total connection duration.
    ///
    /// Default: 1800 seconds (30 minutes)
    #[serde(default = "defaults::connection_secs")]
    pub connection_secs: u64,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            command_secs: defaults::command_secs(),
            connection_secs: defaults::connection_secs(),
        }
    }
}

impl SessionTimeouts {
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_secs)
    }
}

mod defaults {
    pub const fn command_secs() -> u64 {
        300
    }

    pub const fn connection_secs() -> u64 {
        1800
    }
}
