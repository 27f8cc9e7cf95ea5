//! Inbound message dispatch: parse one frame and apply it to the hub.

use tracing::{debug, instrument};

use super::connection::PeerConnection;
use super::hub::Hub;
use crate::ids::ClientId;
use crate::metrics;
use crate::protocol::InboundMessage;

/// What a frame did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Not JSON, not an object, or an unknown `type`.
    Ignored,
    /// Registered as a client with this identity.
    ClientRegistered(ClientId),
    /// Registered as a technician.
    TechnicianRegistered,
    /// Registration on a connection that already has a role.
    AlreadyRegistered,
    /// Command queued for its target.
    CommandForwarded,
    /// Target unknown or closed; nothing sent.
    CommandUndelivered,
    /// Screenshot queued for this many technicians.
    ScreenshotRelayed(usize),
}

/// Route one raw frame from `conn`.
///
/// Malformed input never produces a reply or closes the connection.
#[instrument(skip_all, fields(conn_id = %conn.id))]
pub fn route_message(hub: &Hub, conn: &PeerConnection, raw: &str) -> RouteOutcome {
    let Some(message) = InboundMessage::parse(raw) else {
        ::metrics::counter!(metrics::MESSAGES_IGNORED_TOTAL).increment(1);
        debug!(len = raw.len(), "ignoring unrecognized frame");
        return RouteOutcome::Ignored;
    };
    let kind = message.kind();
    ::metrics::counter!(metrics::MESSAGES_RECEIVED_TOTAL, "type" => kind).increment(1);
    debug!(kind, "routing message");

    match message {
        InboundMessage::RegisterClient { name } => hub
            .register_client(conn, name)
            .map_or(RouteOutcome::AlreadyRegistered, RouteOutcome::ClientRegistered),
        InboundMessage::RegisterTechnician => {
            if hub.register_technician(conn) {
                RouteOutcome::TechnicianRegistered
            } else {
                RouteOutcome::AlreadyRegistered
            }
        }
        InboundMessage::Command { target, cmd } => {
            if hub.send_command(&target, cmd) {
                RouteOutcome::CommandForwarded
            } else {
                RouteOutcome::CommandUndelivered
            }
        }
        InboundMessage::Screenshot { client_id, image } => {
            RouteOutcome::ScreenshotRelayed(hub.relay_screenshot(conn, client_id, image))
        }
    }
}
