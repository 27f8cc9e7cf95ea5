//! WebSocket layer: connections, the hub, routing and liveness.

pub mod connection;
pub mod heartbeat;
pub mod hub;
pub mod registry;
pub mod router;
pub mod session;
