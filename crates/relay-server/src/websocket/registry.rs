//! Identity → client connection mapping.

use std::sync::Arc;

use indexmap::IndexMap;

use super::connection::PeerConnection;
use crate::ids::ClientId;
use crate::protocol::ClientSummary;

/// Registered client connections, in registration order.
///
/// Not synchronized on its own; the [`Hub`](super::hub::Hub) owns it behind
/// its state lock.
#[derive(Default)]
pub struct ClientRegistry {
    clients: IndexMap<ClientId, Arc<PeerConnection>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a client. Identities are hub-generated and never collide.
    pub fn register(&mut self, client_id: ClientId, connection: Arc<PeerConnection>) {
        let _ = self.clients.insert(client_id, connection);
    }

    /// Remove a client. Returns `false` if it was not registered.
    pub fn unregister(&mut self, client_id: &str) -> bool {
        // `shift_remove` keeps the remaining entries in registration order.
        self.clients.shift_remove(client_id).is_some()
    }

    /// Look up a client for targeted delivery.
    pub fn get(&self, client_id: &str) -> Option<&Arc<PeerConnection>> {
        self.clients.get(client_id)
    }

    /// `(identity, display name)` for every registered client.
    pub fn snapshot(&self) -> Vec<ClientSummary> {
        self.clients
            .iter()
            .map(|(client_id, conn)| ClientSummary {
                client_id: client_id.clone(),
                name: conn.display_name(),
            })
            .collect()
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
