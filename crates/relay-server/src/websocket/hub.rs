//! Connection hub: unicast and operator fan-out over live WebSocket clients.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::{counter, gauge};
use relay_core::{Channel, ConnectionId, OutboundEvent};
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::{RELAY_DROPPED_EVENTS_TOTAL, RELAY_OPERATORS_ACTIVE};

/// Live connections indexed by ID. Operator membership is a flag on each
/// connection, so removing a connection also ends its membership.
pub struct ConnectionHub {
    connections: DashMap<ConnectionId, Arc<ClientConnection>>,
}

impl ConnectionHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Add a connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let _ = self.connections.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID.
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        let removed = self.connections.remove(connection_id).map(|(_, conn)| conn);
        if removed.as_ref().is_some_and(|conn| conn.is_operator()) {
            self.record_operator_count();
        }
        removed
    }

    /// Look up a live connection.
    pub fn get(&self, connection_id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections
            .get(connection_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of connections currently in the operator group.
    pub fn operator_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().is_operator())
            .count()
    }

    /// Outbound events dropped across live connections.
    pub fn dropped_total(&self) -> u64 {
        self.connections
            .iter()
            .map(|entry| entry.value().drop_count())
            .sum()
    }

    fn record_operator_count(&self) {
        gauge!(RELAY_OPERATORS_ACTIVE).set(self.operator_count() as f64);
    }

    /// Hand a frame to one connection, counting it if dropped.
    fn deliver(conn: &ClientConnection, frame: Arc<String>) -> bool {
        let sent = conn.send(frame);
        if !sent {
            counter!(RELAY_DROPPED_EVENTS_TOTAL).increment(1);
        }
        sent
    }

    fn serialize(event: &OutboundEvent) -> Option<Arc<String>> {
        match event.to_json() {
            Ok(json) => Some(Arc::new(json)),
            Err(e) => {
                warn!(event = event.event_name(), error = %e, "failed to serialize event");
                None
            }
        }
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for ConnectionHub {
    fn join_operator_group(&self, connection_id: &ConnectionId) {
        if let Some(conn) = self.connections.get(connection_id) {
            conn.set_operator(true);
        }
        self.record_operator_count();
    }

    fn leave(&self, connection_id: &ConnectionId) {
        if let Some(conn) = self.connections.get(connection_id) {
            conn.set_operator(false);
        }
        self.record_operator_count();
    }

    fn is_operator(&self, connection_id: &ConnectionId) -> bool {
        self.connections
            .get(connection_id)
            .is_some_and(|conn| conn.is_operator())
    }

    fn unicast(&self, connection_id: &ConnectionId, event: &OutboundEvent) -> bool {
        let Some(conn) = self.get(connection_id) else {
            debug!(conn_id = %connection_id, event = event.event_name(), "unicast target gone");
            return false;
        };
        let Some(json) = Self::serialize(event) else {
            return false;
        };
        let sent = Self::deliver(&conn, json);
        if !sent {
            warn!(conn_id = %connection_id, event = event.event_name(), "failed to send event to client");
        }
        sent
    }

    fn broadcast_to_operators(&self, event: &OutboundEvent) -> usize {
        let Some(json) = Self::serialize(event) else {
            return 0;
        };
        let operators: Vec<Arc<ClientConnection>> = self
            .connections
            .iter()
            .filter(|entry| entry.value().is_operator())
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut recipients = 0;
        for conn in &operators {
            if Self::deliver(conn, Arc::clone(&json)) {
                recipients += 1;
            } else {
                warn!(conn_id = %conn.id, event = event.event_name(), "failed to send event to operator");
            }
        }
        debug!(event = event.event_name(), recipients, "broadcast to operators");
        recipients
    }
}
