//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the relay server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `8080`; `0` picks a free port).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Liveness sweep interval.
    pub heartbeat_interval: Duration,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue capacity.
    pub send_queue_capacity: usize,
    /// Directory served at `/`; `None` disables static files.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            max_connections: 500,
            heartbeat_interval: Duration::from_secs(30),
            max_message_size: 16 * 1024 * 1024, // 16 MB
            send_queue_capacity: 64,
            static_dir: Some(PathBuf::from("public")),
        }
    }
}

impl ServerConfig {
    /// Loopback on a free port with static files disabled.
    pub fn ephemeral() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: None,
            ..Self::default()
        }
    }
}
