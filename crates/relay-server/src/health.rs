//! `/health` endpoint body.

use std::time::Instant;

use relay_core::SessionRegistry;
use serde::Serialize;

use crate::websocket::hub::ConnectionHub;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` while the relay is serving.
    pub status: &'static str,
    pub uptime_secs: u64,
    /// Open WebSocket connections, with or without a role.
    pub connections: usize,
    /// Connections in the operator group.
    pub operators: usize,
    /// Users with a live conversation.
    pub active_sessions: usize,
    /// Outbound events discarded because a client queue was full or closed.
    pub dropped_events: u64,
}

/// Read current relay counters.
pub fn health_check(
    start_time: Instant,
    hub: &ConnectionHub,
    registry: &SessionRegistry,
) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        connections: hub.connection_count(),
        operators: hub.operator_count(),
        active_sessions: registry.len(),
        dropped_events: hub.dropped_total(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use relay_core::{Channel, ConnectionId};
    use tokio::sync::mpsc;

    use super::*;
    use crate::websocket::connection::ClientConnection;

    #[test]
    fn empty_relay() {
        let resp = health_check(Instant::now(), &ConnectionHub::new(), &SessionRegistry::new());
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
        assert_eq!(resp.connections, 0);
        assert_eq!(resp.dropped_events, 0);
    }

    #[test]
    fn reports_roles_sessions_and_drops() {
        let hub = ConnectionHub::new();
        let registry = SessionRegistry::new();

        let (tx_op, _rx_op) = mpsc::channel(4);
        let op = ConnectionId::from_raw("op");
        hub.add(Arc::new(ClientConnection::new(op.clone(), tx_op)));
        hub.join_operator_group(&op);

        let (tx_user, rx_user) = mpsc::channel(4);
        let user = ConnectionId::from_raw("user");
        hub.add(Arc::new(ClientConnection::new(user.clone(), tx_user)));
        registry.register(&user).unwrap();
        drop(rx_user);
        assert!(!hub.unicast(&user, &relay_core::OutboundEvent::UserDisconnected(op.clone())));

        let start = Instant::now().checked_sub(Duration::from_secs(60)).unwrap();
        let json = serde_json::to_value(health_check(start, &hub, &registry)).unwrap();
        assert_eq!(json["connections"], 2);
        assert_eq!(json["operators"], 1);
        assert_eq!(json["active_sessions"], 1);
        assert_eq!(json["dropped_events"], 1);
        assert!(json["uptime_secs"].as_u64().unwrap() >= 59);
    }
}
