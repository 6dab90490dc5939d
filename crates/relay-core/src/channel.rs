use crate::events::OutboundEvent;
use crate::ids::ConnectionId;

/// Outbound delivery seam between the router and the transport.
///
/// Implementations must keep per-destination order: two sends to the same
/// connection arrive in the order they were issued. Delivery is best effort;
/// a send to a connection that has gone away is dropped without error.
pub trait Channel: Send + Sync {
    /// Flag the connection as an operator. Idempotent.
    fn join_operator_group(&self, connection_id: &ConnectionId);

    /// Drop operator membership. Called once the connection has closed.
    fn leave(&self, connection_id: &ConnectionId);

    fn is_operator(&self, connection_id: &ConnectionId) -> bool;

    /// Deliver to exactly one connection. Returns `false` if dropped.
    fn unicast(&self, connection_id: &ConnectionId, event: &OutboundEvent) -> bool;

    /// Deliver to every current operator. Returns the number of recipients
    /// the event was handed to.
    fn broadcast_to_operators(&self, event: &OutboundEvent) -> usize;
}
