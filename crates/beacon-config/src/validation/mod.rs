//! Full configuration validation.
//!
//! Checks numeric ranges of every section and collects all errors into a
//! single `ConfigError`.

mod helpers;


use crate::schema::{BackoffKind, BeaconConfig};
use beacon_common::ConfigError;

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &BeaconConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_ipc(&mut errors, config);
    validate_retry(&mut errors, config);
    validate_presence(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_ipc(errors: &mut Vec<String>, config: &BeaconConfig) {
    validate_range(errors, "ipc.port", u64::from(config.ipc.port), 1, 65535);
    validate_range(
        errors,
        "ipc.connect_timeout_secs",
        config.ipc.connect_timeout_secs,
        1,
        60,
    );
}

fn validate_retry(errors: &mut Vec<String>, config: &BeaconConfig) {
    validate_range(errors, "retry.delay_secs", config.retry.delay_secs, 1, 3600);
    if config.retry.backoff == BackoffKind::Exponential
        && config.retry.max_delay_secs < config.retry.delay_secs
    {
        errors.push(format!(
            "retry.max_delay_secs = {} is less than retry.delay_secs = {}",
            config.retry.max_delay_secs, config.retry.delay_secs
        ));
    }
}

fn validate_presence(errors: &mut Vec<String>, config: &BeaconConfig) {
    validate_range(
        errors,
        "presence.channel_capacity",
        u64::from(config.presence.channel_capacity),
        1,
        4096,
    );
}
