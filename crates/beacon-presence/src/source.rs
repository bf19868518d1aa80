//! Presence sources.
//!
//! The OS-level presence reader is an external collaborator; anything that
//! can produce [`PresenceUpdate`]s on a channel can drive the forwarder.

use std::io::{BufRead, Read};

use async_trait::async_trait;
use beacon_common::PresenceError;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::PresenceUpdate;

/// Something that delivers presence updates.
#[async_trait]
pub trait PresenceSource: Send {
    /// Begin delivering updates. The receiver closes when the source ends.
    /// A source can be started once.
    async fn start(&mut self) -> Result<mpsc::Receiver<PresenceUpdate>, PresenceError>;
}

// ---------------------------------------------------------------------------
// JSON lines
// ---------------------------------------------------------------------------

/// Reads one JSON [`PresenceUpdate`] per line from an async reader.
///
/// Blank lines are ignored. Lines that are not UTF-8 or not a valid update
/// are logged and skipped; only EOF or an I/O error ends the source.
pub struct JsonLinesSource<R> {
    reader: Option<R>,
    capacity: usize,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, capacity: usize) -> Self {
        Self {
            reader: Some(reader),
            capacity,
        }
    }
}

#[async_trait]
impl<R> PresenceSource for JsonLinesSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn start(&mut self) -> Result<mpsc::Receiver<PresenceUpdate>, PresenceError> {
        check_capacity(self.capacity)?;
        let reader = self.reader.take().ok_or(PresenceError::AlreadyStarted)?;

        let (update_tx, update_rx) = mpsc::channel(self.capacity);
        tokio::spawn(read_updates(reader, update_tx));
        info!("presence source started");
        Ok(update_rx)
    }
}

async fn read_updates<R>(reader: R, update_tx: mpsc::Sender<PresenceUpdate>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("presence source reached end of input");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "presence source read error");
                return;
            }
        }
        line_no += 1;

        let Some(update) = parse_update(&buf, line_no) else {
            continue;
        };
        if update_tx.send(update).await.is_err() {
            debug!("presence receiver dropped");
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Blocking JSON lines
// ---------------------------------------------------------------------------

/// Like [`JsonLinesSource`], but reads a blocking reader on its own thread.
///
/// Used for stdin: a read parked on the thread never holds up runtime
/// shutdown, so the process can exit while input is still open.
pub struct BlockingLinesSource<R> {
    reader: Option<R>,
    capacity: usize,
}

impl<R> BlockingLinesSource<R>
where
    R: Read + Send + 'static,
{
    pub fn new(reader: R, capacity: usize) -> Self {
        Self {
            reader: Some(reader),
            capacity,
        }
    }
}

impl BlockingLinesSource<std::io::Stdin> {
    pub fn stdin(capacity: usize) -> Self {
        Self::new(std::io::stdin(), capacity)
    }
}

#[async_trait]
impl<R> PresenceSource for BlockingLinesSource<R>
where
    R: Read + Send + 'static,
{
    async fn start(&mut self) -> Result<mpsc::Receiver<PresenceUpdate>, PresenceError> {
        check_capacity(self.capacity)?;
        let reader = self.reader.take().ok_or(PresenceError::AlreadyStarted)?;

        let (update_tx, update_rx) = mpsc::channel(self.capacity);
        std::thread::Builder::new()
            .name("presence-reader".into())
            .spawn(move || read_updates_blocking(reader, update_tx))
            .map_err(|e| PresenceError::SourceUnavailable(format!("failed to spawn reader: {e}")))?;
        info!("presence source started");
        Ok(update_rx)
    }
}

fn read_updates_blocking<R: Read>(reader: R, update_tx: mpsc::Sender<PresenceUpdate>) {
    let mut reader = std::io::BufReader::new(reader);
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                info!("presence source reached end of input");
                return;
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "presence source read error");
                return;
            }
        }
        line_no += 1;

        let Some(update) = parse_update(&buf, line_no) else {
            continue;
        };
        if update_tx.blocking_send(update).is_err() {
            debug!("presence receiver dropped");
            return;
        }
    }
}

fn check_capacity(capacity: usize) -> Result<(), PresenceError> {
    if capacity == 0 {
        return Err(PresenceError::SourceUnavailable(
            "channel capacity must be non-zero".into(),
        ));
    }
    Ok(())
}

/// Decode one input line, logging and returning `None` for anything that
/// is blank or not a valid update.
fn parse_update(raw: &[u8], line_no: u64) -> Option<PresenceUpdate> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(e) => {
            warn!(line = line_no, error = %e, "skipping presence line that is not UTF-8");
            return None;
        }
    };
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str(line) {
        Ok(update) => Some(update),
        Err(e) => {
            warn!(line = line_no, error = %e, "skipping malformed presence update");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Source backed by an existing channel, for embedding the bridge.
pub struct ChannelSource {
    rx: Option<mpsc::Receiver<PresenceUpdate>>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<PresenceUpdate>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A sender and the source it feeds.
    pub fn pair(capacity: usize) -> (mpsc::Sender<PresenceUpdate>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl PresenceSource for ChannelSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<PresenceUpdate>, PresenceError> {
        self.rx.take().ok_or(PresenceError::AlreadyStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn json_lines_skips_blank_and_malformed_lines() {
        let input = concat!(
            "{\"client_id\":\"1\",\"activity\":{\"details\":\"a\"}}\n",
            "\n",
            "not json\n",
            "   \n",
            "{\"client_id\":\"2\"}\n",
        );
        let mut source = JsonLinesSource::new(input.as_bytes(), 8);
        let mut rx = source.start().await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.client_id, "1");
        assert_eq!(first.activity.details, "a");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.client_id, "2");

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn json_lines_skips_invalid_utf8() {
        let input = b"\xff\xfe not utf8\n{\"client_id\":\"2\"}\n";
        let mut source = JsonLinesSource::new(&input[..], 8);
        let mut rx = source.start().await.unwrap();

        assert_eq!(rx.recv().await.unwrap().client_id, "2");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn json_lines_follows_a_live_stream() {
        let (reader, mut writer) = tokio::io::duplex(256);
        let mut source = JsonLinesSource::new(reader, 4);
        let mut rx = source.start().await.unwrap();

        writer
            .write_all(b"{\"client_id\":\"7\",\"activity\":{\"state\":\"Idle\"}}\n")
            .await
            .unwrap();
        let update = rx.recv().await.unwrap();
        assert_eq!(update.activity.state, "Idle");

        drop(writer);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn json_lines_starts_once() {
        let mut source = JsonLinesSource::new(&b""[..], 1);
        assert!(source.start().await.is_ok());
        assert!(matches!(
            source.start().await,
            Err(PresenceError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn zero_capacity_is_rejected() {
        let mut source = JsonLinesSource::new(&b""[..], 0);
        assert!(matches!(
            source.start().await,
            Err(PresenceError::SourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn blocking_lines_skip_bad_input() {
        let input = b"{\"client_id\":\"1\"}\r\n\xff\n\nnope\n{\"client_id\":\"3\"}";
        let mut source = BlockingLinesSource::new(std::io::Cursor::new(input.to_vec()), 2);
        let mut rx = source.start().await.unwrap();

        assert_eq!(rx.recv().await.unwrap().client_id, "1");
        assert_eq!(rx.recv().await.unwrap().client_id, "3");
        assert!(rx.recv().await.is_none());

        assert!(matches!(
            source.start().await,
            Err(PresenceError::AlreadyStarted)
        ));
    }

    /// A reader that never returns, like stdin held open by a parent.
    struct Stalled;

    impl Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                std::thread::park();
            }
        }
    }

    #[test]
    fn stalled_blocking_reader_does_not_hold_up_runtime_shutdown() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let rx = rt.block_on(async { BlockingLinesSource::new(Stalled, 1).start().await });
            assert!(rx.is_ok());
            drop(rx);
            drop(rt);
            done_tx.send(()).unwrap();
        });

        done_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("runtime shutdown waited on the blocked reader");
    }

    #[tokio::test]
    async fn channel_source_hands_out_its_receiver_once() {
        let (tx, mut source) = ChannelSource::pair(2);
        let mut rx = source.start().await.unwrap();

        tx.send(PresenceUpdate {
            client_id: "9".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(rx.recv().await.unwrap().client_id, "9");

        assert!(matches!(
            source.start().await,
            Err(PresenceError::AlreadyStarted)
        ));
    }
}
