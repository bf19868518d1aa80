use std::path::PathBuf;

use beacon_config::BeaconConfig;
use clap::Parser;

/// Beacon: forwards rich-presence activity to the desktop app over local IPC.
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port the desktop app listens on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log filter override (e.g. debug, beacon=trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Give up after this many connection attempts (0 = never).
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut BeaconConfig) {
        if let Some(port) = self.port {
            config.ipc.port = port;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
