use serde::{Deserialize, Serialize};

/// Where presence updates come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Line-delimited JSON on standard input.
    #[default]
    Stdin,
}

/// Presence source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub source: SourceKind,
    /// Buffered updates between the source and the forwarder (valid range: 1-4096).
    pub channel_capacity: u32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Stdin,
            channel_capacity: 64,
        }
    }
}
