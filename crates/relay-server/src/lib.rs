//! # relay-server
//!
//! Axum HTTP + `WebSocket` transport for the support relay.
//!
//! - `WebSocket` gateway: one session task per connection, one dispatcher
//!   task that serializes all routing
//! - Connection hub implementing unicast and operator-group broadcast
//! - `/health` endpoint and static asset hosting
//! - Prometheus metrics for connections, operators and dropped events
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{RelayServer, ServerHandle};
