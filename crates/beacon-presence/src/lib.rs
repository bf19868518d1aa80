//! Presence updates and their path to the IPC client.
//!
//! A [`PresenceSource`] delivers [`PresenceUpdate`]s; the
//! [`PresenceForwarder`] drops updates without an identity or identical to
//! the last one forwarded, remaps the rest into wire [`Activity`] records
//! and hands them to an [`ActivitySink`].
//!
//! [`Activity`]: beacon_ipc::Activity
//! [`ActivitySink`]: beacon_ipc::ActivitySink

pub mod forwarder;
pub mod source;
pub mod types;

pub use forwarder::{Decision, PresenceForwarder};
pub use source::{BlockingLinesSource, ChannelSource, JsonLinesSource, PresenceSource};
pub use types::{Assets, PresenceActivity, PresenceUpdate, Timestamps};
