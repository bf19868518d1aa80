//! Beacon configuration.
//!
//! TOML-based configuration with validation. Every section uses serde
//! defaults, so an empty or partial file yields a working config.
//!
//! ```rust,no_run
//! let config = beacon_config::load_config(None).expect("failed to load config");
//! println!("ipc port: {}", config.ipc.port);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    BackoffKind, BeaconConfig, IpcConfig, LogLevel, LoggingConfig, PresenceConfig, RetryConfig,
    SourceKind,
};

use std::path::Path;

use beacon_common::ConfigError;

/// Load and validate the config.
///
/// With `path`, that file must exist. Without it, `config.toml` is read from
/// the platform config directory and created with defaults if missing.
pub fn load_config(path: Option<&Path>) -> Result<BeaconConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    validation::validate(&config)?;
    Ok(config)
}
