use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("not connected")]
    NotConnected,

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {addr}: timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("failed to marshal: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to write: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to read: {0}")]
    Read(#[source] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("reader is owned by the background read worker")]
    ReaderDetached,

    #[error("gave up after {attempts} connection attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<IpcError> },
}

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("presence source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("presence source already started")]
    AlreadyStarted,
}

#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error(transparent)]
    Presence(#[from] PresenceError),

}
