//! # relay-server
//!
//! WebSocket relay hub between remote client machines and technicians.
//!
//! - Wire protocol: tagged JSON messages (`register_client`, `register_tech`,
//!   `command`, `screenshot`)
//! - Hub: connection set, client registry, routing and `client_list` fan-out
//! - Liveness: periodic ping sweep that closes peers missing a pong
//! - HTTP host: `/ws`, `/health`, `/metrics`, static assets
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod ids;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod shutdown;
pub mod websocket;
