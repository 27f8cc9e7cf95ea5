//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::websocket::hub::Hub;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open WebSocket connections of any role.
    pub connections: usize,
    /// Registered clients.
    pub clients: usize,
    /// Registered technicians.
    pub technicians: usize,
}

/// Build a health response from the hub's live counters.
pub fn health_check(start_time: Instant, hub: &Hub) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: hub.connection_count(),
        clients: hub.client_count(),
        technicians: hub.technician_count(),
    }
}
