//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file may contain any subset of fields; missing ones keep their defaults.

mod server;

pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the relay hub.
///
/// # JSON Format
///
/// ```json
/// {
///   "server": { "port": 9090, "staticDir": "public" },
///   "heartbeat": { "intervalMs": 15000 },
///   "logging": { "level": "debug", "json": true }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Listener and connection limits.
    pub server: ServerSettings,
    /// Liveness probe schedule.
    pub heartbeat: HeartbeatSettings,
    /// Log output configuration.
    pub logging: LoggingSettings,
}

impl RelaySettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat.interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "heartbeat.intervalMs must be greater than zero".into(),
            ));
        }
        if self.server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be greater than zero".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
