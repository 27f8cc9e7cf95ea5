//! # relay-hub
//!
//! Relay hub binary: loads settings, starts logging and metrics, and runs the
//! WebSocket relay until interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relay_logging::LogFormat;
use relay_server::config::ServerConfig;
use relay_server::server::RelayServer;
use relay_settings::RelaySettings;

/// How long shutdown waits for the server and monitor before aborting them.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket relay between remote machines and technicians.
#[derive(Parser, Debug)]
#[command(name = "relay-hub", about = "WebSocket relay hub", version)]
struct Cli {
    /// Settings file (defaults to `~/.relay-hub/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Directory of static assets served at `/` (overrides settings).
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Default log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

/// Merge loaded settings with CLI overrides into a server config.
fn server_config(settings: &RelaySettings, cli: &Cli) -> ServerConfig {
    let server = &settings.server;
    let static_dir = match &cli.static_dir {
        Some(dir) => Some(dir.clone()),
        None => server
            .static_dir
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(PathBuf::from),
    };
    ServerConfig {
        host: cli.host.clone().unwrap_or_else(|| server.host.clone()),
        port: cli.port.unwrap_or(server.port),
        max_connections: server.max_connections,
        heartbeat_interval: Duration::from_millis(settings.heartbeat.interval_ms),
        max_message_size: server.max_message_size,
        send_queue_capacity: server.send_queue_capacity,
        static_dir,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => relay_settings::load_settings_from_path(path),
        None => relay_settings::load_settings(),
    }
    .context("Failed to load settings")?;

    let level = cli.log_level.as_deref().unwrap_or(settings.logging.level.as_str());
    let format = LogFormat::from_json_flag(cli.json_logs || settings.logging.json);
    relay_logging::init_subscriber(level, format).context("Failed to initialize logging")?;

    let metrics_handle =
        relay_server::metrics::install_recorder().context("Failed to install metrics recorder")?;

    let config = server_config(&settings, &cli);
    let server = RelayServer::new(config, metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("relay hub listening on http://{addr} (websocket at ws://{addr}/ws)");

    relay_server::shutdown::wait_for_signal().await;

    tracing::info!("Shutting down...");
    server.shutdown().track(handle);
    if server.shutdown().drain(SHUTDOWN_TIMEOUT).await {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!("Shutdown deadline passed, remaining tasks aborted");
    }
    Ok(())
}
