//! The hub: owns every connection and the client registry.
//!
//! All state lives behind one mutex and every operation runs to completion
//! while holding it. Outbound delivery is `try_send` into per-connection
//! queues, which never blocks and never re-enters the hub, so fan-out happens
//! under the lock too. That keeps successive `client_list` updates in order.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::{Liveness, OutboundText, PeerConnection, Role};
use super::registry::ClientRegistry;
use crate::ids::{ClientId, ConnectionId};
use crate::metrics;
use crate::protocol::{ClientSummary, DEFAULT_CLIENT_NAME, OutboundMessage, TECHNICIAN_ACK};

/// Result of one liveness sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections moved to pending and sent a ping.
    pub probed: usize,
    /// Connections force-closed for missing the previous probe.
    pub terminated: usize,
}

#[derive(Default)]
struct HubState {
    registry: ClientRegistry,
    connections: IndexMap<ConnectionId, Arc<PeerConnection>>,
}

impl HubState {
    fn admit(&mut self, queue_capacity: usize) -> (Arc<PeerConnection>, mpsc::Receiver<OutboundText>) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let conn = Arc::new(PeerConnection::new(ConnectionId::new(), tx));
        let _ = self.connections.insert(conn.id.clone(), conn.clone());
        ::metrics::counter!(metrics::WS_CONNECTIONS_TOTAL).increment(1);
        self.record_gauges();
        info!(conn_id = %conn.id, connections = self.connections.len(), "peer connected");
        (conn, rx)
    }

    /// Remove a connection from the open set and, if it was a client, from
    /// the registry. Returns whether the registry changed.
    fn evict(&mut self, id: &ConnectionId) -> Option<bool> {
        let conn = self.connections.shift_remove(id)?;
        conn.close();
        let was_client = conn
            .client_id()
            .is_some_and(|client_id| self.registry.unregister(client_id.as_str()));
        Some(was_client)
    }

    fn broadcast_to_technicians(&self, message: &OutboundMessage) -> usize {
        let Some(json) = message.to_json() else {
            return 0;
        };
        let json = Arc::new(json);
        let mut delivered = 0;
        for conn in self
            .connections
            .values()
            .filter(|c| c.is_technician() && c.is_open())
        {
            if conn.send_text(json.clone()) {
                delivered += 1;
            } else {
                warn!(conn_id = %conn.id, "technician queue full, frame dropped");
            }
        }
        delivered
    }

    fn broadcast_client_list(&self) -> usize {
        let clients = self.registry.snapshot();
        let count = clients.len();
        let recipients = self.broadcast_to_technicians(&OutboundMessage::ClientList { clients });
        debug!(clients = count, recipients, "broadcast client list");
        recipients
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_gauges(&self) {
        ::metrics::gauge!(metrics::WS_CONNECTIONS_ACTIVE).set(self.connections.len() as f64);
        ::metrics::gauge!(metrics::CLIENTS_ACTIVE).set(self.registry.len() as f64);
    }
}

/// Connection registry and message fan-out for one relay instance.
pub struct Hub {
    state: Mutex<HubState>,
    send_queue_capacity: usize,
}

impl Hub {
    /// Create an empty hub. `send_queue_capacity` bounds each connection's
    /// outbound queue.
    pub fn new(send_queue_capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            send_queue_capacity: send_queue_capacity.max(1),
        }
    }

    /// Admit a new peer. The returned receiver feeds its socket writer.
    pub fn connect(&self) -> (Arc<PeerConnection>, mpsc::Receiver<OutboundText>) {
        let mut state = self.state.lock();
        state.admit(self.send_queue_capacity)
    }

    /// Admit a new peer unless `max_connections` are already open.
    ///
    /// The count and the insert happen under one lock, so concurrent callers
    /// never overshoot the limit.
    pub fn try_connect(
        &self,
        max_connections: usize,
    ) -> Option<(Arc<PeerConnection>, mpsc::Receiver<OutboundText>)> {
        let mut state = self.state.lock();
        if state.connections.len() >= max_connections {
            return None;
        }
        Some(state.admit(self.send_queue_capacity))
    }

    /// Handle a closed connection. Idempotent.
    ///
    /// A client is evicted from the registry and technicians receive the new
    /// list. Returns `false` if the connection was already gone.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        let mut state = self.state.lock();
        let Some(was_client) = state.evict(id) else {
            return false;
        };
        ::metrics::counter!(metrics::WS_DISCONNECTIONS_TOTAL).increment(1);
        state.record_gauges();
        info!(conn_id = %id, was_client, connections = state.connections.len(), "peer disconnected");
        if was_client {
            let _ = state.broadcast_client_list();
        }
        true
    }

    /// Register `conn` as a client.
    ///
    /// Generates the identity, replies with `registered` and broadcasts the
    /// new list. Returns `None` when the connection already has a role or
    /// has been closed.
    pub fn register_client(&self, conn: &PeerConnection, name: Option<String>) -> Option<ClientId> {
        let mut state = self.state.lock();
        let conn_arc = state.connections.get(&conn.id).cloned()?;

        let client_id = ClientId::generate();
        let display_name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string());
        let role = Role::Client {
            client_id: client_id.clone(),
            display_name: display_name.clone(),
        };
        if !conn.try_assign_role(role) {
            debug!(conn_id = %conn.id, role = conn.role().label(), "ignoring repeated registration");
            return None;
        }

        state.registry.register(client_id.clone(), conn_arc);
        ::metrics::counter!(metrics::CLIENTS_REGISTERED_TOTAL).increment(1);
        state.record_gauges();
        info!(conn_id = %conn.id, client_id = %client_id, name = %display_name, "client registered");

        let reply = OutboundMessage::Registered {
            client_id: client_id.clone(),
        };
        if let Some(json) = reply.to_json() {
            let _ = conn.send_text(Arc::new(json));
        }
        let _ = state.broadcast_client_list();
        Some(client_id)
    }

    /// Register `conn` as a technician, acknowledge it and broadcast the
    /// current list to every technician (the new one included).
    pub fn register_technician(&self, conn: &PeerConnection) -> bool {
        let state = self.state.lock();
        if !state.connections.contains_key(&conn.id) {
            return false;
        }
        if !conn.try_assign_role(Role::Technician) {
            debug!(conn_id = %conn.id, role = conn.role().label(), "ignoring repeated registration");
            return false;
        }
        info!(conn_id = %conn.id, "technician registered");

        let ack = OutboundMessage::Ack {
            msg: TECHNICIAN_ACK.to_string(),
        };
        if let Some(json) = ack.to_json() {
            let _ = conn.send_text(Arc::new(json));
        }
        let _ = state.broadcast_client_list();
        true
    }

    /// Forward `cmd` to the client registered as `target`.
    ///
    /// Returns whether it was queued. Unknown or closed targets are a silent
    /// miss.
    pub fn send_command(&self, target: &str, cmd: Option<Value>) -> bool {
        let state = self.state.lock();
        let Some(conn) = state.registry.get(target).filter(|c| c.is_open()) else {
            ::metrics::counter!(metrics::COMMANDS_TOTAL, "outcome" => "missed").increment(1);
            debug!(target, "command target not connected");
            return false;
        };
        let delivered = OutboundMessage::Command { cmd }
            .to_json()
            .is_some_and(|json| conn.send_text(Arc::new(json)));
        let outcome = if delivered { "delivered" } else { "dropped" };
        ::metrics::counter!(metrics::COMMANDS_TOTAL, "outcome" => outcome).increment(1);
        debug!(target, conn_id = %conn.id, outcome, "command forwarded");
        delivered
    }

    /// Relay a screenshot from `from` to every open technician.
    ///
    /// `clientName` is the sender's registered display name. Returns the
    /// number of technicians it was queued for.
    pub fn relay_screenshot(
        &self,
        from: &PeerConnection,
        client_id: Option<Value>,
        image: Option<Value>,
    ) -> usize {
        let state = self.state.lock();
        let message = OutboundMessage::Screenshot {
            client_id,
            image,
            client_name: from.display_name(),
        };
        let recipients = state.broadcast_to_technicians(&message);
        ::metrics::counter!(metrics::SCREENSHOTS_RELAYED_TOTAL).increment(1);
        debug!(conn_id = %from.id, recipients, "screenshot relayed");
        recipients
    }

    /// One liveness round.
    ///
    /// Connections still pending from the previous round are force-closed and
    /// evicted; every other connection goes pending and is pinged.
    pub fn sweep_liveness(&self) -> SweepReport {
        let mut state = self.state.lock();
        let mut report = SweepReport::default();
        let mut registry_changed = false;

        let connections: Vec<Arc<PeerConnection>> = state.connections.values().cloned().collect();
        for conn in connections {
            match conn.begin_probe() {
                Liveness::Pending => {
                    warn!(conn_id = %conn.id, role = conn.role().label(), "liveness probe unanswered, terminating");
                    registry_changed |= state.evict(&conn.id).unwrap_or(false);
                    report.terminated += 1;
                    ::metrics::counter!(metrics::LIVENESS_TERMINATIONS_TOTAL).increment(1);
                    ::metrics::counter!(metrics::WS_DISCONNECTIONS_TOTAL).increment(1);
                }
                Liveness::Alive => {
                    if conn.request_ping() {
                        report.probed += 1;
                    }
                }
            }
        }

        if report.terminated > 0 {
            state.record_gauges();
        }
        if registry_changed {
            let _ = state.broadcast_client_list();
        }
        debug!(probed = report.probed, terminated = report.terminated, "liveness sweep");
        report
    }

    /// Close every connection and clear all state (server shutdown).
    pub fn close_all(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.connections.len();
        for conn in state.connections.values() {
            conn.close();
        }
        state.connections.clear();
        state.registry = ClientRegistry::new();
        state.record_gauges();
        info!(count, "closed all connections");
        count
    }

    /// Current registry snapshot.
    pub fn snapshot(&self) -> Vec<ClientSummary> {
        self.state.lock().registry.snapshot()
    }

    /// Number of open connections of any role.
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Number of registered technicians.
    pub fn technician_count(&self) -> usize {
        self.state
            .lock()
            .connections
            .values()
            .filter(|c| c.is_technician())
            .count()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use futures::FutureExt;
    use serde_json::json;

    use super::*;

    type Peer = (Arc<PeerConnection>, mpsc::Receiver<OutboundText>);

    fn drain(rx: &mut mpsc::Receiver<OutboundText>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(serde_json::from_str(&text).unwrap());
        }
        out
    }

    fn pinged(conn: &PeerConnection) -> bool {
        conn.ping_requested().now_or_never().is_some()
    }

    fn technician(hub: &Hub) -> Peer {
        let (conn, mut rx) = hub.connect();
        assert!(hub.register_technician(&conn));
        let _ = drain(&mut rx);
        (conn, rx)
    }

    fn client(hub: &Hub, name: &str) -> (Arc<PeerConnection>, mpsc::Receiver<OutboundText>, ClientId) {
        let (conn, mut rx) = hub.connect();
        let id = hub.register_client(&conn, Some(name.into())).unwrap();
        let _ = drain(&mut rx);
        (conn, rx, id)
    }

    fn listed_ids(msg: &Value) -> Vec<String> {
        msg["clients"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["clientId"].as_str().unwrap().to_string())
            .collect()
    }

    // ── connect / disconnect ────────────────────────────────────────

    #[test]
    fn connect_tracks_connection() {
        let hub = Hub::default();
        let (conn, _rx) = hub.connect();
        assert_eq!(hub.connection_count(), 1);
        assert_eq!(conn.role(), Role::Unassigned);
    }

    #[test]
    fn try_connect_enforces_limit() {
        let hub = Hub::default();
        let (first, _rx1) = hub.try_connect(2).unwrap();
        let (_second, _rx2) = hub.try_connect(2).unwrap();
        assert!(hub.try_connect(2).is_none());
        assert_eq!(hub.connection_count(), 2);

        let _ = hub.disconnect(&first.id);
        assert!(hub.try_connect(2).is_some());
    }

    #[test]
    fn concurrent_try_connect_never_exceeds_limit() {
        let hub = Arc::new(Hub::default());
        let admitted: usize = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    let hub = hub.clone();
                    scope.spawn(move || {
                        (0..20)
                            .filter_map(|_| hub.try_connect(10))
                            // Receivers are dropped; the entries stay in the hub.
                            .count()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).sum()
        });
        assert_eq!(admitted, 10);
        assert_eq!(hub.connection_count(), 10);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let hub = Hub::default();
        let (conn, _rx) = hub.connect();
        assert!(hub.disconnect(&conn.id));
        assert!(!hub.disconnect(&conn.id));
        assert_eq!(hub.connection_count(), 0);
        assert!(!conn.is_open());
    }

    // ── register_client ─────────────────────────────────────────────

    #[test]
    fn register_client_replies_with_identity() {
        let hub = Hub::default();
        let (conn, mut rx) = hub.connect();
        let id = hub.register_client(&conn, Some("Bob".into())).unwrap();

        let msgs = drain(&mut rx);
        assert_eq!(msgs, vec![json!({"type": "registered", "clientId": id.as_str()})]);
        assert_eq!(hub.snapshot(), vec![ClientSummary { client_id: id, name: "Bob".into() }]);
    }

    #[test]
    fn register_client_defaults_name() {
        let hub = Hub::default();
        let (a, _ra) = hub.connect();
        let (b, _rb) = hub.connect();
        let _ = hub.register_client(&a, None).unwrap();
        let _ = hub.register_client(&b, Some(String::new())).unwrap();
        let names: Vec<String> = hub.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Cliente", "Cliente"]);
    }

    #[test]
    fn register_client_broadcasts_to_technicians_only() {
        let hub = Hub::default();
        let (_t, mut trx) = technician(&hub);
        let (_other, mut orx, _) = client(&hub, "Other");
        let _ = drain(&mut trx);

        let (_c, _crx, id) = client(&hub, "Bob");

        let tech_msgs = drain(&mut trx);
        assert_eq!(tech_msgs.len(), 1);
        assert_eq!(tech_msgs[0]["type"], "client_list");
        assert!(listed_ids(&tech_msgs[0]).contains(&id.to_string()));
        assert!(drain(&mut orx).is_empty());
    }

    #[test]
    fn identities_unique_and_snapshot_exact() {
        let hub = Hub::default();
        let mut peers = Vec::new();
        for i in 0..50 {
            peers.push(client(&hub, &format!("c{i}")));
        }
        let ids: HashSet<ClientId> = peers.iter().map(|(_, _, id)| id.clone()).collect();
        assert_eq!(ids.len(), 50);

        // Close every third one.
        for (conn, _, _) in peers.iter().step_by(3) {
            assert!(hub.disconnect(&conn.id));
        }
        let expected: Vec<ClientId> = peers
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 3 != 0)
            .map(|(_, (_, _, id))| id.clone())
            .collect();
        let listed: Vec<ClientId> = hub.snapshot().into_iter().map(|s| s.client_id).collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn repeated_registration_ignored() {
        let hub = Hub::default();
        let (conn, mut rx, id) = client(&hub, "Bob");
        assert!(hub.register_client(&conn, Some("Again".into())).is_none());
        assert!(!hub.register_technician(&conn));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(hub.snapshot().len(), 1);
        assert_eq!(conn.client_id(), Some(id));
        assert_eq!(hub.technician_count(), 0);
    }

    #[test]
    fn technician_cannot_become_client() {
        let hub = Hub::default();
        let (conn, _rx) = technician(&hub);
        assert!(hub.register_client(&conn, Some("x".into())).is_none());
        assert!(hub.snapshot().is_empty());
    }

    #[test]
    fn registration_after_disconnect_rejected() {
        let hub = Hub::default();
        let (conn, _rx) = hub.connect();
        let _ = hub.disconnect(&conn.id);
        assert!(hub.register_client(&conn, None).is_none());
        assert!(!hub.register_technician(&conn));
        assert!(hub.snapshot().is_empty());
    }

    // ── register_tech ───────────────────────────────────────────────

    #[test]
    fn register_technician_acks_then_lists() {
        let hub = Hub::default();
        let (_c, _crx, id) = client(&hub, "Bob");
        let (conn, mut rx) = hub.connect();
        assert!(hub.register_technician(&conn));

        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], json!({"type": "ack", "msg": TECHNICIAN_ACK}));
        assert_eq!(
            msgs[1],
            json!({"type": "client_list", "clients": [{"clientId": id.as_str(), "name": "Bob"}]})
        );
    }

    #[test]
    fn register_technician_broadcasts_to_all_technicians() {
        let hub = Hub::default();
        let (_t1, mut rx1) = technician(&hub);
        let (_t2, mut rx2) = technician(&hub);
        let msgs = drain(&mut rx1);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["type"], "client_list");
        assert!(drain(&mut rx2).is_empty());
        assert_eq!(hub.technician_count(), 2);
    }

    // ── command ─────────────────────────────────────────────────────

    #[test]
    fn command_reaches_only_target() {
        let hub = Hub::default();
        let (_t, mut trx) = technician(&hub);
        let (_a, mut arx, a_id) = client(&hub, "A");
        let (_b, mut brx, _) = client(&hub, "B");
        let _ = drain(&mut trx);

        assert!(hub.send_command(a_id.as_str(), Some(json!("lock"))));
        assert_eq!(drain(&mut arx), vec![json!({"type": "command", "cmd": "lock"})]);
        assert!(drain(&mut brx).is_empty());
        assert!(drain(&mut trx).is_empty());
    }

    #[test]
    fn command_to_unknown_target_is_silent() {
        let hub = Hub::default();
        let (_t, mut trx) = technician(&hub);
        let (_a, mut arx, _) = client(&hub, "A");
        let _ = drain(&mut trx);

        assert!(!hub.send_command("no-such-client", Some(json!("lock"))));
        assert!(drain(&mut trx).is_empty());
        assert!(drain(&mut arx).is_empty());
    }

    #[test]
    fn command_to_closed_target_is_silent() {
        let hub = Hub::default();
        let (conn, _rx, id) = client(&hub, "A");
        let _ = hub.disconnect(&conn.id);
        assert!(!hub.send_command(id.as_str(), Some(json!("lock"))));
    }

    // ── screenshot ──────────────────────────────────────────────────

    #[test]
    fn screenshot_goes_to_every_technician_and_no_client() {
        let hub = Hub::default();
        let (_t1, mut t1rx) = technician(&hub);
        let (_t2, mut t2rx) = technician(&hub);
        let (sender, mut srx, id) = client(&hub, "Bob");
        let (_other, mut orx, _) = client(&hub, "Other");
        let (_idle, mut irx) = hub.connect();
        let _ = drain(&mut t1rx);
        let _ = drain(&mut t2rx);

        let n = hub.relay_screenshot(&sender, Some(json!(id.as_str())), Some(json!("AAAA")));
        assert_eq!(n, 2);
        let expected = json!({
            "type": "screenshot",
            "clientId": id.as_str(),
            "image": "AAAA",
            "clientName": "Bob",
        });
        assert_eq!(drain(&mut t1rx), vec![expected.clone()]);
        assert_eq!(drain(&mut t2rx), vec![expected]);
        assert!(drain(&mut srx).is_empty());
        assert!(drain(&mut orx).is_empty());
        assert!(drain(&mut irx).is_empty());
    }

    #[test]
    fn screenshot_from_unregistered_sender_uses_default_name() {
        let hub = Hub::default();
        let (_t, mut trx) = technician(&hub);
        let (anon, _arx) = hub.connect();
        let _ = hub.relay_screenshot(&anon, None, Some(json!("img")));
        let msgs = drain(&mut trx);
        assert_eq!(msgs[0]["clientName"], "Cliente");
        assert!(msgs[0].get("clientId").is_none());
    }

    #[test]
    fn screenshot_skips_closed_technicians() {
        let hub = Hub::default();
        let (t, _trx) = technician(&hub);
        let (sender, _srx, _) = client(&hub, "Bob");
        t.close();
        assert_eq!(hub.relay_screenshot(&sender, None, Some(json!("x"))), 0);
    }

    // ── disconnect broadcast ────────────────────────────────────────

    #[test]
    fn client_disconnect_broadcasts_updated_list() {
        let hub = Hub::default();
        let (_t, mut trx) = technician(&hub);
        let (a, _arx, a_id) = client(&hub, "A");
        let (_b, _brx, b_id) = client(&hub, "B");
        let _ = drain(&mut trx);

        assert!(hub.disconnect(&a.id));
        let msgs = drain(&mut trx);
        assert_eq!(msgs.len(), 1);
        let ids = listed_ids(&msgs[0]);
        assert!(!ids.contains(&a_id.to_string()));
        assert!(ids.contains(&b_id.to_string()));
    }

    #[test]
    fn technician_disconnect_does_not_broadcast() {
        let hub = Hub::default();
        let (t1, _rx1) = technician(&hub);
        let (_t2, mut rx2) = technician(&hub);
        assert!(hub.disconnect(&t1.id));
        assert!(drain(&mut rx2).is_empty());
    }

    // ── liveness ────────────────────────────────────────────────────

    #[test]
    fn first_sweep_probes_everyone() {
        let hub = Hub::default();
        let (a, _arx) = hub.connect();
        let (t, _trx) = technician(&hub);
        let report = hub.sweep_liveness();
        assert_eq!(report, SweepReport { probed: 2, terminated: 0 });
        assert_eq!(a.liveness(), Liveness::Pending);
        assert!(pinged(&a));
        assert!(pinged(&t));
    }

    #[test]
    fn full_queue_does_not_block_liveness_ping() {
        // Capacity 2: the ack and the client list fill the technician's queue.
        let hub = Hub::new(2);
        let (tech, rx) = hub.connect();
        assert!(hub.register_technician(&tech));
        assert_eq!(rx.len(), 2);
        assert!(!tech.send_text(Arc::new("{}".into())));

        let first = hub.sweep_liveness();
        assert_eq!(first.probed, 1);
        assert!(pinged(&tech));
        // The peer answers the ping it was sent.
        tech.mark_alive();

        let second = hub.sweep_liveness();
        assert_eq!(second.terminated, 0);
        assert!(tech.is_open());
        assert_eq!(hub.technician_count(), 1);
    }

    #[test]
    fn unanswered_probe_terminates_on_next_sweep() {
        let hub = Hub::default();
        let (t, mut trx) = technician(&hub);
        let (silent, _srx, silent_id) = client(&hub, "Silent");
        let (chatty, _crx, _) = client(&hub, "Chatty");
        let _ = drain(&mut trx);

        let _ = hub.sweep_liveness();
        chatty.mark_alive();
        t.mark_alive();

        let report = hub.sweep_liveness();
        assert_eq!(report.terminated, 1);
        assert!(!silent.is_open());
        assert!(chatty.is_open());
        assert_eq!(hub.connection_count(), 2);

        let lists: Vec<Value> = drain(&mut trx)
            .into_iter()
            .filter(|m| m["type"] == "client_list")
            .collect();
        assert_eq!(lists.len(), 1);
        assert!(!listed_ids(&lists[0]).contains(&silent_id.to_string()));

        // The socket loop's own disconnect afterwards is a no-op.
        assert!(!hub.disconnect(&silent.id));
    }

    #[test]
    fn responsive_connection_never_terminated() {
        let hub = Hub::default();
        let (conn, _rx) = hub.connect();
        for _ in 0..10 {
            let report = hub.sweep_liveness();
            assert_eq!(report.terminated, 0);
            conn.mark_alive();
        }
        assert!(conn.is_open());
    }

    #[test]
    fn silent_connection_closed_within_two_sweeps() {
        let hub = Hub::default();
        let (conn, _rx) = hub.connect();
        let _ = hub.sweep_liveness();
        assert!(conn.is_open());
        let _ = hub.sweep_liveness();
        assert!(!conn.is_open());
        assert_eq!(hub.connection_count(), 0);
    }

    // ── shutdown ────────────────────────────────────────────────────

    #[test]
    fn close_all_clears_everything() {
        let hub = Hub::default();
        let (t, _trx) = technician(&hub);
        let (c, _crx, _) = client(&hub, "A");
        assert_eq!(hub.close_all(), 2);
        assert!(!t.is_open());
        assert!(!c.is_open());
        assert_eq!(hub.connection_count(), 0);
        assert!(hub.snapshot().is_empty());
    }

    #[test]
    fn counters() {
        let hub = Hub::default();
        let (_t, _trx) = technician(&hub);
        let (_c, _crx, _) = client(&hub, "A");
        let (_u, _urx) = hub.connect();
        assert_eq!(hub.connection_count(), 3);
        assert_eq!(hub.client_count(), 1);
        assert_eq!(hub.technician_count(), 1);
    }
}
