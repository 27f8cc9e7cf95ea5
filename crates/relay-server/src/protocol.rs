//! JSON wire protocol.
//!
//! Every frame is one UTF-8 JSON object tagged by `type`. Fields that the hub
//! only forwards (`cmd`, `image`, a screenshot's `clientId`) stay as raw
//! [`serde_json::Value`]: an explicit `null` is kept, a missing key stays
//! missing on the way out.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ids::ClientId;

/// Display name used when a client registers without one.
pub const DEFAULT_CLIENT_NAME: &str = "Cliente";

/// Text of the `ack` sent to a newly registered technician.
pub const TECHNICIAN_ACK: &str = "Técnico autenticado";

/// Messages accepted from peers.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    /// Register this connection as a controlled machine.
    RegisterClient {
        /// Human label; defaults to [`DEFAULT_CLIENT_NAME`]. Anything but a
        /// string counts as absent.
        #[serde(default, deserialize_with = "string_or_none")]
        name: Option<String>,
    },
    /// Register this connection as a technician.
    #[serde(rename = "register_tech")]
    RegisterTechnician,
    /// Forward `cmd` to the client registered as `target`.
    Command {
        /// Identity of the receiving client.
        target: String,
        /// Opaque command payload.
        #[serde(default, deserialize_with = "present")]
        cmd: Option<Value>,
    },
    /// Fan a screen capture out to every technician.
    Screenshot {
        /// Echoed as received, whatever its JSON type.
        #[serde(default, deserialize_with = "present")]
        client_id: Option<Value>,
        /// Opaque image payload.
        #[serde(default, deserialize_with = "present")]
        image: Option<Value>,
    },
}

/// A key that is present maps to `Some`, including `null`.
fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

fn string_or_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl InboundMessage {
    /// Parse one frame. `None` for anything the hub does not understand.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Wire name of the message type, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegisterClient { .. } => "register_client",
            Self::RegisterTechnician => "register_tech",
            Self::Command { .. } => "command",
            Self::Screenshot { .. } => "screenshot",
        }
    }
}

/// One row of a `client_list`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    /// Registered identity.
    pub client_id: ClientId,
    /// Display name.
    pub name: String,
}

/// Messages sent to peers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    /// Reply to `register_client`.
    Registered {
        /// Identity assigned by the hub.
        client_id: ClientId,
    },
    /// Reply to `register_tech`.
    Ack {
        /// Human-readable confirmation.
        msg: String,
    },
    /// Current registry snapshot.
    ClientList {
        /// Registered clients in registration order.
        clients: Vec<ClientSummary>,
    },
    /// Command forwarded to a client.
    Command {
        /// Opaque payload from the technician.
        #[serde(skip_serializing_if = "Option::is_none")]
        cmd: Option<Value>,
    },
    /// Screen capture forwarded to technicians.
    Screenshot {
        /// Identity the sender put in its message.
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<Value>,
        /// Opaque image payload.
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<Value>,
        /// Display name of the sending connection.
        client_name: String,
    },
}

impl OutboundMessage {
    /// Serialize to a text frame.
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize outbound message");
                None
            }
        }
    }
}
