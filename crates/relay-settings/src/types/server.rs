//! Server, heartbeat and logging settings.

use serde::{Deserialize, Serialize};

/// Listener and per-connection limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP / WebSocket port.
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Max WebSocket message size in bytes. Screenshots arrive as base64 JPEG,
    /// so this is generous.
    pub max_message_size: usize,
    /// Outbound frames buffered per connection before new ones are dropped.
    pub send_queue_capacity: usize,
    /// Directory served for non-WebSocket requests. `None` disables static files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 500,
            max_message_size: 16 * 1024 * 1024,
            send_queue_capacity: 64,
            static_dir: Some("public".to_string()),
        }
    }
}

/// Liveness probe schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeartbeatSettings {
    /// Interval between liveness sweeps in milliseconds. A peer that misses
    /// one full interval after a probe is terminated.
    pub interval_ms: u64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self { interval_ms: 30_000 }
    }
}

/// Log output configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset (e.g. `"info"`,
    /// `"relay_server=debug"`).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
