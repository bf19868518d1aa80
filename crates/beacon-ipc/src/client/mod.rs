//! Transport client owning the single connection to the desktop app.

use std::future::Future;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use beacon_common::IpcError;
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::protocol::{self, Activity, ActivityPayload, DEFAULT_PORT};
use crate::retry::{RetryPolicy, Sleeper};
use crate::worker::{read_frame, ReadWorker};


/// The desktop app only ever listens on loopback.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Capacity of the channel between the read worker and its owner.
const READ_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`IpcClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Loopback port of the desktop app. `0` selects [`DEFAULT_PORT`].
    pub port: u16,
    /// Upper bound on a single dial.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct Connection {
    writer: OwnedWriteHalf,
    /// `None` once handed to a [`ReadWorker`].
    reader: Option<BufReader<OwnedReadHalf>>,
}

/// Line-delimited JSON client for the desktop app.
///
/// Created unconnected. Errors after a successful connect are returned to
/// the caller; the client never reconnects on its own.
pub struct IpcClient {
    config: ClientConfig,
    conn: Option<Connection>,
}

impl IpcClient {
    /// Client for `port` with the default connect timeout.
    pub fn new(port: u16) -> Self {
        Self::with_config(ClientConfig {
            port,
            ..ClientConfig::default()
        })
    }

    pub fn with_config(mut config: ClientConfig) -> Self {
        if config.port == 0 {
            config.port = DEFAULT_PORT;
        }
        Self { config, conn: None }
    }

    /// `host:port` this client dials.
    pub fn addr(&self) -> String {
        format!("{LOOPBACK_HOST}:{}", self.config.port)
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Dial the desktop app once, bounded by the connect timeout.
    ///
    /// Replaces any existing connection on success.
    pub async fn connect(&mut self) -> Result<(), IpcError> {
        let addr = self.addr();
        let timeout = self.config.connect_timeout;

        let stream = dial(&addr, timeout, TcpStream::connect(&addr)).await?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        self.conn = Some(Connection {
            writer: write_half,
            reader: Some(BufReader::new(read_half)),
        });

        info!(addr = %addr, "connected to desktop app");
        Ok(())
    }

    /// Call [`connect`](Self::connect) until it succeeds or `policy` gives up.
    ///
    /// Returns the number of attempts made.
    pub async fn connect_with_retry(
        &mut self,
        policy: &RetryPolicy,
        sleeper: &dyn Sleeper,
    ) -> Result<u32, IpcError> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let err = match self.connect().await {
                Ok(()) => return Ok(attempt),
                Err(e) => e,
            };

            if !policy.allows_retry(attempt) {
                return Err(IpcError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = policy.delay_after(attempt);
            warn!(
                attempt,
                error = %err,
                "Failed to connect, make sure the desktop app is running. Retrying in {:?}",
                delay
            );
            sleeper.sleep(delay).await;
        }
    }

    /// Shut down the connection if there is one. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.writer.shutdown().await {
                debug!(error = %e, "error shutting down connection");
            }
            info!(addr = %self.addr(), "connection closed");
        }
    }

    /// Write `data` followed by the frame terminator.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), IpcError> {
        self.write_frame(&protocol::frame(data)).await
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), IpcError> {
        let conn = self.conn.as_mut().ok_or(IpcError::NotConnected)?;
        conn.writer
            .write_all(frame)
            .await
            .map_err(IpcError::Write)?;
        debug!(sent = %String::from_utf8_lossy(frame).trim_end(), "ipc frame");
        Ok(())
    }

    pub async fn send_str(&mut self, msg: &str) -> Result<(), IpcError> {
        self.send(msg.as_bytes()).await
    }

    /// Serialize `value` to compact JSON and send it as one frame.
    pub async fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), IpcError> {
        let frame = protocol::encode_line(value)?;
        self.write_frame(&frame).await
    }

    /// Send an `activity_update` message.
    pub async fn send_activity(&mut self, activity: &Activity) -> Result<(), IpcError> {
        self.send_json(&ActivityPayload::from(activity.clone()))
            .await
    }

    /// Send an `activity_clear` message.
    pub async fn clear_activity(&mut self) -> Result<(), IpcError> {
        self.send_json(&ActivityPayload::ActivityClear).await
    }

    /// Wait for the next inbound frame, terminator included.
    pub async fn read(&mut self) -> Result<Vec<u8>, IpcError> {
        let conn = self.conn.as_mut().ok_or(IpcError::NotConnected)?;
        let reader = conn.reader.as_mut().ok_or(IpcError::ReaderDetached)?;
        read_frame(reader).await
    }

    /// Move the read half into a background [`ReadWorker`].
    ///
    /// Afterwards [`read`](Self::read) fails with `ReaderDetached`; sending
    /// is unaffected.
    pub fn start_reading(&mut self) -> Result<ReadWorker, IpcError> {
        let conn = self.conn.as_mut().ok_or(IpcError::NotConnected)?;
        let reader = conn.reader.take().ok_or(IpcError::ReaderDetached)?;
        Ok(ReadWorker::spawn(reader, READ_CHANNEL_CAPACITY))
    }
}

/// Await `connecting`, giving up after `timeout`.
async fn dial<F>(addr: &str, timeout: Duration, connecting: F) -> Result<TcpStream, IpcError>
where
    F: Future<Output = io::Result<TcpStream>>,
{
    match tokio::time::timeout(timeout, connecting).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(IpcError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_elapsed) => Err(IpcError::ConnectTimeout {
            addr: addr.to_string(),
            timeout,
        }),
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::with_config(ClientConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Destination for remapped activities.
#[async_trait]
pub trait ActivitySink: Send {
    async fn send_activity(&mut self, activity: &Activity) -> Result<(), IpcError>;
    async fn clear_activity(&mut self) -> Result<(), IpcError>;
}

#[async_trait]
impl ActivitySink for IpcClient {
    async fn send_activity(&mut self, activity: &Activity) -> Result<(), IpcError> {
        IpcClient::send_activity(self, activity).await
    }

    async fn clear_activity(&mut self) -> Result<(), IpcError> {
        IpcClient::clear_activity(self).await
    }
}
