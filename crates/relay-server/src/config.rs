//! Server configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `3000`, `0` for auto-assign).
    pub port: u16,
    /// Directory served for every path that is not `/ws` or `/health`.
    pub public_dir: PathBuf,
    /// Outbound queue depth per connection. Sends beyond it are dropped.
    pub max_send_queue: usize,
    /// Depth of the shared inbound queue feeding the dispatcher.
    pub event_queue: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            public_dir: PathBuf::from("public"),
            max_send_queue: 256,
            event_queue: 1024,
            max_message_size: 1024 * 1024, // 1 MB
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
