pub mod errors;

pub use errors::{BeaconError, ConfigError, IpcError, PresenceError};
