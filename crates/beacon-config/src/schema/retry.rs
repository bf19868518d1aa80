use serde::{Deserialize, Serialize};

/// Delay growth between connection attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Startup connection retry behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts before giving up; 0 retries forever.
    pub max_attempts: u32,
    /// Delay between attempts in seconds (valid range: 1-3600).
    pub delay_secs: u64,
    pub backoff: BackoffKind,
    /// Upper bound for exponential backoff, in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            delay_secs: 5,
            backoff: BackoffKind::Fixed,
            max_delay_secs: 60,
        }
    }
}
