//! Per-socket state shared between the hub, the writer task and the session.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_core::ConnectionId;
use tokio::sync::mpsc;

/// One live relay client. Roles are flags: a client becomes an operator by
/// joining the group and a user by registering a session, and may be both.
pub struct ClientConnection {
    pub id: ConnectionId,
    /// Outbound queue drained by this client's single writer task.
    outbound: mpsc::Sender<Arc<String>>,
    operator: AtomicBool,
    /// Close already reported to the dispatcher.
    closed: AtomicBool,
    pub connected_at: Instant,
    dropped_events: AtomicU64,
}

impl ClientConnection {
    /// Create a connection with no role.
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            outbound,
            operator: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            connected_at: Instant::now(),
            dropped_events: AtomicU64::new(0),
        }
    }

    /// Enqueue a serialized event without waiting.
    ///
    /// A full or closed queue discards the event and bumps the drop counter.
    pub fn send(&self, frame: Arc<String>) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                let _ = self.dropped_events.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Events dropped for this connection so far.
    pub fn drop_count(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Set or clear operator-group membership.
    pub fn set_operator(&self, operator: bool) {
        self.operator.store(operator, Ordering::Relaxed);
    }

    /// Whether the connection is in the operator group.
    pub fn is_operator(&self) -> bool {
        self.operator.load(Ordering::Relaxed)
    }

    /// Claim the right to report this connection's close.
    ///
    /// Returns `true` exactly once, for the first caller.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Whether the close has been claimed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Time since the socket was upgraded.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
