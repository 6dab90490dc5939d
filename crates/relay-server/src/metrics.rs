//! Prometheus recorder and metric names for the relay.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Call once at startup; the returned handle renders `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// WebSocket connections opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket connections closed (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connection lifetime in seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Connections in the operator group (gauge).
pub const RELAY_OPERATORS_ACTIVE: &str = "relay_operators_active";
/// Outbound events discarded on a full or closed client queue (counter).
pub const RELAY_DROPPED_EVENTS_TOTAL: &str = "relay_dropped_events_total";
/// Live user sessions (gauge, recorded by the router).
pub const RELAY_SESSIONS_ACTIVE: &str = "relay_sessions_active";
/// Accepted conversation messages (counter, labels: sender; recorded by the router).
pub const RELAY_MESSAGES_TOTAL: &str = "relay_messages_total";
