//! Sensor Daemon - Team Sensor command center backend
//!
//! Serves login, the site overview and the sensor status table, and runs
//! probe cycles on request.

use anyhow::Result;
use clap::Parser;
use sensor_common::Config;
use sensord::{server, state::AppState};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensord")]
#[command(about = "Team Sensor command center backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to /etc/sensorboard/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("Sensor Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match cli.config {
        Some(path) => Config::load_from_path(&path)?,
        None => Config::load(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }

    info!(
        "Probe settings: timeout={}s workers={} url_column={}",
        config.probe.timeout_secs, config.probe.workers, config.probe.url_column
    );

    let state = AppState::new(config)?;
    server::run(state).await
}
