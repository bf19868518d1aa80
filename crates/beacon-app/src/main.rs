//! beacon: forwards rich-presence activity to the desktop app.
//!
//! Waits for the desktop app's loopback IPC port, then relays deduplicated
//! presence updates as line-delimited JSON until the presence source ends
//! or the process is interrupted.

mod bridge;
mod cli;

use std::process::ExitCode;

use beacon_config::LogLevel;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn level_directive(level: LogLevel) -> String {
    format!("beacon={}", level.as_str())
}

/// `--log-level` if it parses, otherwise `RUST_LOG` if it parses.
fn explicit_filter(cli_directive: Option<&str>, env_directive: Option<&str>) -> Option<EnvFilter> {
    if let Some(directive) = cli_directive {
        match EnvFilter::try_new(directive) {
            Ok(filter) => return Some(filter),
            Err(e) => eprintln!("invalid --log-level {directive:?}: {e}"),
        }
    }
    env_directive.and_then(|directive| EnvFilter::try_new(directive).ok())
}

/// Install the subscriber before anything else logs.
///
/// Returns a handle for applying the configured level when neither
/// `--log-level` nor `RUST_LOG` chose a filter.
fn init_logging(cli_directive: Option<&str>) -> Option<FilterHandle> {
    let env_directive = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let explicit = explicit_filter(cli_directive, env_directive.as_deref());
    let pinned = explicit.is_some();
    let filter =
        explicit.unwrap_or_else(|| EnvFilter::new(level_directive(LogLevel::default())));

    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    (!pinned).then_some(handle)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let filter_handle = init_logging(args.log_level.as_deref());
    tracing::info!("Beacon v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = beacon_config::load_config(args.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        beacon_config::BeaconConfig::default()
    });

    if let Some(handle) = filter_handle {
        let directive = level_directive(config.logging.level);
        if let Err(e) = handle.reload(EnvFilter::new(&directive)) {
            tracing::warn!("Failed to apply log level {directive}: {e}");
        }
    }
    args.apply(&mut config);

    match bridge::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn configured_level_targets_beacon_crates() {
        assert_eq!(level_directive(LogLevel::Warn), "beacon=warn");
        assert_eq!(level_directive(LogLevel::default()), "beacon=info");
    }

    #[test]
    fn no_explicit_filter_leaves_room_for_config() {
        assert!(explicit_filter(None, None).is_none());
    }

    #[test]
    fn cli_filter_wins_over_env() {
        let filter = explicit_filter(Some("beacon=trace"), Some("beacon=error")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn invalid_cli_filter_falls_back_to_env() {
        let filter = explicit_filter(Some("beacon=notalevel"), Some("warn")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn invalid_env_filter_is_ignored() {
        assert!(explicit_filter(None, Some("beacon=notalevel")).is_none());
    }
}
