//! Per-peer connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use crate::ids::{ClientId, ConnectionId};
use crate::protocol::DEFAULT_CLIENT_NAME;

/// Role a connection has claimed.
///
/// Starts as [`Role::Unassigned`] and is set at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Role {
    /// No registration message received yet.
    #[default]
    Unassigned,
    /// A controlled machine.
    Client {
        /// Identity assigned at registration.
        client_id: ClientId,
        /// Human label.
        display_name: String,
    },
    /// An observer that may issue commands.
    Technician,
}

impl Role {
    /// Short name for logs and metrics labels.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Client { .. } => "client",
            Self::Technician => "technician",
        }
    }
}

/// Two-state liveness flag driven by the liveness monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// Responded since the last probe (or freshly connected).
    Alive,
    /// Probed and still waiting for the pong.
    Pending,
}

/// A serialized JSON text frame queued for the socket writer.
pub type OutboundText = Arc<String>;

/// One accepted WebSocket peer.
///
/// Text frames go through a bounded queue. Liveness pings are signalled
/// separately so a backed-up queue never swallows a liveness ping.
pub struct PeerConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    role: Mutex<Role>,
    /// Send channel to the socket writer task.
    tx: mpsc::Sender<OutboundText>,
    ping: Notify,
    /// When this connection was established.
    pub connected_at: Instant,
    alive: AtomicBool,
    dropped_messages: AtomicU64,
    closed: CancellationToken,
}

impl PeerConnection {
    /// Create a new, unassigned, alive connection.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<OutboundText>) -> Self {
        Self {
            id,
            role: Mutex::new(Role::Unassigned),
            tx,
            ping: Notify::new(),
            connected_at: Instant::now(),
            alive: AtomicBool::new(true),
            dropped_messages: AtomicU64::new(0),
            closed: CancellationToken::new(),
        }
    }

    /// Current role.
    pub fn role(&self) -> Role {
        self.role.lock().clone()
    }

    /// Assign a role if none has been assigned yet.
    ///
    /// Returns `false` (and leaves the role untouched) when the connection
    /// already registered.
    pub fn try_assign_role(&self, role: Role) -> bool {
        let mut current = self.role.lock();
        if *current != Role::Unassigned {
            return false;
        }
        *current = role;
        true
    }

    /// Whether this connection registered as a technician.
    pub fn is_technician(&self) -> bool {
        matches!(*self.role.lock(), Role::Technician)
    }

    /// Client identity, if registered as a client.
    pub fn client_id(&self) -> Option<ClientId> {
        match &*self.role.lock() {
            Role::Client { client_id, .. } => Some(client_id.clone()),
            _ => None,
        }
    }

    /// Name used when relaying this connection's screenshots.
    pub fn display_name(&self) -> String {
        match &*self.role.lock() {
            Role::Client { display_name, .. } => display_name.clone(),
            _ => DEFAULT_CLIENT_NAME.to_string(),
        }
    }

    /// Queue a JSON text frame without waiting.
    ///
    /// Returns `false` if the connection is closed or its queue is full; the
    /// frame is dropped and counted.
    pub fn send_text(&self, json: OutboundText) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        if self.tx.try_send(json).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(crate::metrics::WS_DROPPED_FRAMES_TOTAL).increment(1);
            false
        }
    }

    /// Ask the writer to emit a native ping. Repeated requests before the
    /// writer gets to it coalesce into one ping.
    ///
    /// Returns `false` only if the connection is closed.
    pub fn request_ping(&self) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        self.ping.notify_one();
        true
    }

    /// Resolves once a ping has been requested.
    pub async fn ping_requested(&self) {
        self.ping.notified().await;
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Current liveness state.
    pub fn liveness(&self) -> Liveness {
        if self.alive.load(Ordering::Relaxed) {
            Liveness::Alive
        } else {
            Liveness::Pending
        }
    }

    /// Pong received: back to [`Liveness::Alive`].
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
    }

    /// Move to [`Liveness::Pending`] and return the state it was in.
    pub fn begin_probe(&self) -> Liveness {
        if self.alive.swap(false, Ordering::Relaxed) {
            Liveness::Alive
        } else {
            Liveness::Pending
        }
    }

    /// Signal the socket loop to terminate. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Whether frames can still be delivered.
    pub fn is_open(&self) -> bool {
        !self.closed.is_cancelled() && !self.tx.is_closed()
    }

    /// Token cancelled when the connection is closed.
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerConnection")
            .field("id", &self.id)
            .field("role", &self.role())
            .field("liveness", &self.liveness())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
