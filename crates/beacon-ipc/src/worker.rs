//! Background reader that drains inbound frames into a channel.

use beacon_common::IpcError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::protocol::FRAME_TERMINATOR;

/// Why the read worker stopped.
#[derive(Debug)]
pub enum ReadExit {
    /// `stop()` was called.
    Stopped,
    /// The frame receiver was dropped.
    ReceiverDropped,
    /// Reading from the socket failed; the error was logged once.
    Failed(IpcError),
    /// The task panicked or was aborted.
    Aborted,
}

/// Handle to the background read task.
///
/// Frames are delivered in arrival order, terminator included. The channel
/// closes once the task exits, whatever the reason.
pub struct ReadWorker {
    frames: mpsc::Receiver<Vec<u8>>,
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<ReadExit>,
}

impl ReadWorker {
    pub(crate) fn spawn<R>(reader: R, capacity: usize) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (frame_tx, frames) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(read_loop(reader, frame_tx, shutdown_rx));

        Self {
            frames,
            shutdown_tx,
            handle,
        }
    }

    /// Next inbound frame, or `None` once the worker has exited.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.frames.recv().await
    }

    /// Ask the worker to exit. Returns immediately.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    /// Wait for the task to exit. Frames not yet received are discarded.
    pub async fn join(self) -> ReadExit {
        let Self {
            frames,
            shutdown_tx,
            handle,
        } = self;
        drop(frames);
        let joined = handle.await;
        drop(shutdown_tx);
        match joined {
            Ok(exit) => exit,
            Err(e) => {
                warn!(error = %e, "read worker aborted");
                ReadExit::Aborted
            }
        }
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(self) -> ReadExit {
        self.stop();
        self.join().await
    }
}

/// Read one newline-terminated frame.
///
/// EOF before a terminator, including EOF in the middle of a frame, is
/// reported as `ConnectionClosed`.
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, IpcError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = reader
        .read_until(FRAME_TERMINATOR, &mut buf)
        .await
        .map_err(IpcError::Read)?;
    if n == 0 || buf.last() != Some(&FRAME_TERMINATOR) {
        return Err(IpcError::ConnectionClosed);
    }
    Ok(buf)
}

async fn read_loop<R>(
    mut reader: R,
    frame_tx: mpsc::Sender<Vec<u8>>,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> ReadExit
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let result = tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                debug!("read worker stopped");
                return ReadExit::Stopped;
            }
            result = read_frame(&mut reader) => result,
        };

        let frame = match result {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "read error, stopping read worker");
                return ReadExit::Failed(e);
            }
        };

        debug!(received = %String::from_utf8_lossy(&frame).trim_end(), "ipc frame");

        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                debug!("read worker stopped");
                return ReadExit::Stopped;
            }
            sent = frame_tx.send(frame) => {
                if sent.is_err() {
                    debug!("frame receiver dropped, stopping read worker");
                    return ReadExit::ReceiverDropped;
                }
            }
        }
    }
}
