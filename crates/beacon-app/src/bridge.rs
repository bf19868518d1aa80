//! Startup sequence and forwarding loop.

use std::future::Future;
use std::time::Duration;

use beacon_common::BeaconError;
use beacon_config::{BackoffKind, BeaconConfig, IpcConfig, PresenceConfig, RetryConfig, SourceKind};
use beacon_ipc::protocol::decode_line;
use beacon_ipc::{ActivitySink, ClientConfig, IpcClient, ReadWorker, RetryPolicy, TokioSleeper};
use beacon_presence::{BlockingLinesSource, Decision, PresenceForwarder, PresenceSource, PresenceUpdate};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub(crate) fn client_config(config: &IpcConfig) -> ClientConfig {
    ClientConfig {
        port: config.port,
        connect_timeout: Duration::from_secs(config.connect_timeout_secs),
    }
}

pub(crate) fn retry_policy(config: &RetryConfig) -> RetryPolicy {
    let delay = Duration::from_secs(config.delay_secs);
    let policy = match config.backoff {
        BackoffKind::Fixed => RetryPolicy::fixed(delay),
        BackoffKind::Exponential => {
            RetryPolicy::exponential(delay, Duration::from_secs(config.max_delay_secs))
        }
    };
    match config.max_attempts {
        0 => policy,
        n => policy.with_max_attempts(n),
    }
}

fn presence_source(config: &PresenceConfig) -> Box<dyn PresenceSource> {
    let capacity = config.channel_capacity as usize;
    match config.source {
        SourceKind::Stdin => Box::new(BlockingLinesSource::stdin(capacity)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Connect, then forward presence updates until shutdown.
pub(crate) async fn run(config: BeaconConfig) -> Result<(), BeaconError> {
    let mut client = IpcClient::with_config(client_config(&config.ipc));
    let policy = retry_policy(&config.retry);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!(addr = %client.addr(), "Connecting to desktop app");
    let attempts = tokio::select! {
        result = client.connect_with_retry(&policy, &TokioSleeper) => result?,
        _ = &mut shutdown => {
            info!("Shutdown requested before connecting");
            return Ok(());
        }
    };
    info!(attempts, "IPC connection established");

    let mut worker = client.start_reading()?;

    let mut source = presence_source(&config.presence);
    let updates = match source.start().await {
        Ok(updates) => updates,
        Err(e) => {
            worker.shutdown().await;
            client.close().await;
            return Err(e.into());
        }
    };

    forward_loop(&mut client, updates, &mut worker, &mut shutdown).await;

    let exit = worker.shutdown().await;
    debug!(?exit, "read worker finished");
    client.close().await;
    Ok(())
}

/// Forward deduplicated updates to `sink` and drain inbound frames.
///
/// Returns when `shutdown` resolves or the update channel closes. Send
/// failures are logged and the loop keeps going.
pub(crate) async fn forward_loop<S, F>(
    sink: &mut S,
    mut updates: mpsc::Receiver<PresenceUpdate>,
    worker: &mut ReadWorker,
    shutdown: F,
) where
    S: ActivitySink + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut forwarder = PresenceForwarder::new();
    let mut reader_open = true;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                return;
            }
            update = updates.recv() => {
                let Some(update) = update else {
                    info!("Presence source closed");
                    return;
                };
                debug!(?update, "Received presence update");
                match forwarder.forward(&update, &mut *sink).await {
                    Ok(Decision::Forward) => {
                        info!(client_id = %update.client_id, "Activity forwarded");
                    }
                    Ok(decision) => debug!(?decision, "Presence update dropped"),
                    Err(e) => warn!(error = %e, "Failed to send activity"),
                }
            }
            frame = worker.recv(), if reader_open => match frame {
                Some(frame) => match decode_line::<serde_json::Value>(&frame) {
                    Ok(message) => debug!(%message, "Message from desktop app"),
                    Err(e) => warn!(error = %e, "Undecodable message from desktop app"),
                },
                None => {
                    reader_open = false;
                    debug!("Desktop app read stream ended");
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_ipc::{Backoff, ReadExit};
    use beacon_presence::PresenceActivity;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (IpcClient, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut client = IpcClient::new(port);
        let (connect, accept) = tokio::join!(client.connect(), listener.accept());
        connect.unwrap();
        (client, accept.unwrap().0)
    }

    fn update(client_id: &str, details: &str) -> PresenceUpdate {
        PresenceUpdate {
            client_id: client_id.into(),
            activity: PresenceActivity {
                details: details.into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn client_config_from_ipc_section() {
        let config = client_config(&IpcConfig {
            port: 20000,
            connect_timeout_secs: 3,
        });
        assert_eq!(config.port, 20000);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn configured_default_port_matches_client_default() {
        assert_eq!(IpcConfig::default().port, beacon_ipc::DEFAULT_PORT);
        assert_eq!(
            client_config(&IpcConfig::default()),
            ClientConfig::default()
        );
    }

    #[test]
    fn default_retry_is_unlimited_fixed_delay() {
        let policy = retry_policy(&RetryConfig::default());
        assert_eq!(policy, RetryPolicy::fixed(Duration::from_secs(5)));
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn exponential_retry_with_limit() {
        let policy = retry_policy(&RetryConfig {
            max_attempts: 4,
            delay_secs: 2,
            backoff: BackoffKind::Exponential,
            max_delay_secs: 10,
        });
        assert_eq!(policy.max_attempts, Some(4));
        assert_eq!(
            policy.backoff,
            Backoff::Exponential {
                max_delay: Duration::from_secs(10)
            }
        );
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn forwards_only_changed_updates() {
        let (mut client, server) = connected_pair().await;
        let mut worker = client.start_reading().unwrap();
        let (tx, rx) = mpsc::channel(8);

        tx.send(update("1", "Menu")).await.unwrap();
        tx.send(update("1", "Menu")).await.unwrap();
        tx.send(update("", "Ignored")).await.unwrap();
        tx.send(update("1", "Level 2")).await.unwrap();
        drop(tx);

        forward_loop(&mut client, rx, &mut worker, std::future::pending()).await;

        client.close().await;
        let mut lines = BufReader::new(server).lines();
        let mut received = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            received.push(line);
        }
        assert_eq!(
            received,
            vec![
                "{\"type\":\"activity_update\",\"activity\":{\"details\":\"Menu\"}}",
                "{\"type\":\"activity_update\",\"activity\":{\"details\":\"Level 2\"}}",
            ]
        );

        assert!(matches!(worker.shutdown().await, ReadExit::Stopped | ReadExit::Failed(_)));
    }

    #[tokio::test]
    async fn shutdown_ends_loop_with_source_still_open() {
        let (mut client, _server) = connected_pair().await;
        let mut worker = client.start_reading().unwrap();
        let (_tx, rx) = mpsc::channel::<PresenceUpdate>(1);

        tokio::time::timeout(
            Duration::from_secs(2),
            forward_loop(&mut client, rx, &mut worker, async {}),
        )
        .await
        .expect("forward loop ignored shutdown");

        assert!(matches!(worker.shutdown().await, ReadExit::Stopped));
    }

    #[tokio::test]
    async fn loop_survives_peer_closing() {
        let (mut client, server) = connected_pair().await;
        let mut worker = client.start_reading().unwrap();
        drop(server);

        let (tx, rx) = mpsc::channel(8);
        for n in 0..5 {
            tx.send(update("1", &format!("state {n}"))).await.unwrap();
        }
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(2),
            forward_loop(&mut client, rx, &mut worker, std::future::pending()),
        )
        .await
        .expect("forward loop hung after peer closed");

        assert!(matches!(worker.join().await, ReadExit::Failed(_)));
    }
}
