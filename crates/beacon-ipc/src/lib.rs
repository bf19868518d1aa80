//! Client side of the local presence IPC channel.
//!
//! A single outbound TCP connection to a loopback port carries
//! line-delimited JSON messages describing the current activity. The
//! connection is owned by [`IpcClient`]; inbound frames can be drained by a
//! cancellable [`ReadWorker`], and connection establishment is retried
//! according to a [`RetryPolicy`].

pub mod client;
pub mod protocol;
pub mod retry;
pub mod worker;

pub use client::{ActivitySink, ClientConfig, IpcClient};
pub use protocol::{Activity, ActivityPayload, DEFAULT_PORT};
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
pub use worker::{ReadExit, ReadWorker};
