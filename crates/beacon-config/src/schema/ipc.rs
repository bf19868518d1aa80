use serde::{Deserialize, Serialize};

/// Connection to the desktop app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Loopback port the desktop app listens on.
    pub port: u16,
    /// Bound on a single connection attempt, in seconds (valid range: 1-60).
    pub connect_timeout_secs: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            port: 19542,
            connect_timeout_secs: 5,
        }
    }
}
