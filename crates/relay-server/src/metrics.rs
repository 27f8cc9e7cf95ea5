//! Prometheus metrics recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::ServerError;

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Call once at startup before anything is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
///
/// Renders an empty exposition; used by tests and embedders that do not
/// export metrics.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Render Prometheus text format.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// WebSocket connections opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "relay_ws_connections_total";
/// WebSocket connections closed, for any reason (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "relay_ws_disconnections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "relay_ws_connections_active";
/// Upgrades refused at the connection limit (counter).
pub const WS_REJECTED_TOTAL: &str = "relay_ws_rejected_total";
/// Outbound frames dropped on a full or closed queue (counter).
pub const WS_DROPPED_FRAMES_TOTAL: &str = "relay_ws_dropped_frames_total";
/// Parsed inbound messages (counter, labels: type).
pub const MESSAGES_RECEIVED_TOTAL: &str = "relay_messages_received_total";
/// Inbound frames that did not parse (counter).
pub const MESSAGES_IGNORED_TOTAL: &str = "relay_messages_ignored_total";
/// Client registrations (counter).
pub const CLIENTS_REGISTERED_TOTAL: &str = "relay_clients_registered_total";
/// Registered clients (gauge).
pub const CLIENTS_ACTIVE: &str = "relay_clients_active";
/// Commands by outcome (counter, labels: outcome = delivered | missed | dropped).
pub const COMMANDS_TOTAL: &str = "relay_commands_total";
/// Screenshots relayed (counter).
pub const SCREENSHOTS_RELAYED_TOTAL: &str = "relay_screenshots_relayed_total";
/// Connections closed by the liveness monitor (counter).
pub const LIVENESS_TERMINATIONS_TOTAL: &str = "relay_liveness_terminations_total";
