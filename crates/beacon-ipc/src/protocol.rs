//! Wire protocol for the local IPC channel.
//!
//! Each message is one UTF-8 JSON object terminated by a single `\n`. The
//! object carries a `type` tag; `activity_update` messages also carry an
//! `activity` object whose empty fields are left out entirely.

use beacon_common::IpcError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Port the desktop app listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 19542;

/// Byte terminating every frame on the wire.
pub const FRAME_TERMINATOR: u8 = b'\n';

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// A message sent to the desktop app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityPayload {
    /// Replace the displayed activity.
    ActivityUpdate {
        #[serde(default)]
        activity: Activity,
    },
    /// Remove the displayed activity.
    ActivityClear,
}

impl From<Activity> for ActivityPayload {
    fn from(activity: Activity) -> Self {
        Self::ActivityUpdate { activity }
    }
}

/// Display fields of an activity.
///
/// Empty strings and zero timestamps are treated as absent: they are not
/// serialized, and missing keys deserialize back to the empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Activity {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub large_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub small_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub large_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub small_image: String,
    /// Unix epoch seconds.
    #[serde(skip_serializing_if = "is_zero")]
    pub start_time: i64,
    /// Unix epoch seconds.
    #[serde(skip_serializing_if = "is_zero")]
    pub end_time: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// Serialize `value` to compact single-line JSON (no terminator).
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, IpcError> {
    serde_json::to_vec(value).map_err(IpcError::Serialize)
}

/// Copy `data` into a new buffer with the frame terminator appended.
pub fn frame(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + 1);
    buf.extend_from_slice(data);
    buf.push(FRAME_TERMINATOR);
    buf
}

/// Serialize `value` into a complete frame.
pub fn encode_line<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, IpcError> {
    let mut buf = encode(value)?;
    buf.push(FRAME_TERMINATOR);
    Ok(buf)
}

/// Parse one frame. A trailing `\n` (or `\r\n`) is ignored.
pub fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Result<T, IpcError> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    serde_json::from_slice(line).map_err(IpcError::Decode)
}
