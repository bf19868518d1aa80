//! Configuration schema types for Beacon.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod ipc;
mod logging;
mod presence;
mod retry;

pub use ipc::*;
pub use logging::*;
pub use presence::*;
pub use retry::*;

use serde::{Deserialize, Serialize};

/// Root configuration for Beacon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub ipc: IpcConfig,
    pub retry: RetryConfig,
    pub presence: PresenceConfig,
    pub logging: LoggingConfig,
}
