//! Inbound event handling: validate against the registry, mutate, dispatch.

use std::sync::Arc;

use metrics::{counter, gauge};
use tracing::{debug, info};

use crate::channel::Channel;
use crate::errors::RegistryError;
use crate::events::{InboundEvent, NewMessage, OutboundEvent, RoutedMessage, UserInit};
use crate::ids::ConnectionId;
use crate::messages::Sender;
use crate::registry::SessionRegistry;

/// Why an inbound event was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// `join_user` on a connection that already has a session.
    AlreadyRegistered,
    /// The sending connection has no session (not joined, or already gone).
    NoSession,
    /// An operator reply named a connection with no session.
    UnknownTarget,
}

/// Result of handling one event. Never surfaced to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Handled {
        /// Unicast sends the channel accepted.
        unicast: usize,
        /// Operators the broadcast reached.
        broadcast: usize,
    },
    Dropped(DropReason),
}

impl Outcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped(_))
    }
}

/// Routes events between user sessions and the operator group.
///
/// Roles are independent flags: one connection may be both a user and an
/// operator if it sends both join events.
pub struct Router {
    registry: Arc<SessionRegistry>,
    channel: Arc<dyn Channel>,
}

impl Router {
    /// Create a router over a registry and a delivery channel.
    pub fn new(registry: Arc<SessionRegistry>, channel: Arc<dyn Channel>) -> Self {
        Self { registry, channel }
    }

    /// Get the session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Handle one inbound event from `from`.
    pub fn handle(&self, from: &ConnectionId, event: InboundEvent) -> Outcome {
        let name = event.event_name();
        let outcome = match event {
            InboundEvent::JoinOperator => self.join_operator(from),
            InboundEvent::JoinUser => self.join_user(from),
            InboundEvent::UserMessage(text) => self.user_message(from, text),
            InboundEvent::OperatorMessage { target, text } => {
                self.operator_message(from, &target, text)
            }
        };
        match outcome {
            Outcome::Dropped(reason) => debug!(conn_id = %from, event = name, ?reason, "event dropped"),
            Outcome::Handled { unicast, broadcast } => {
                debug!(conn_id = %from, event = name, unicast, broadcast, "event handled");
            }
        }
        outcome
    }

    /// Clean up after a closed connection: drop operator membership and the
    /// session, then tell operators if a user left.
    pub fn disconnect(&self, from: &ConnectionId) -> Outcome {
        self.channel.leave(from);
        match self.registry.remove(from) {
            Ok(session) => {
                info!(
                    conn_id = %from,
                    session_token = %session.session_token,
                    messages = session.messages.len(),
                    "user disconnected"
                );
                self.record_session_count();
                let broadcast = self
                    .channel
                    .broadcast_to_operators(&OutboundEvent::UserDisconnected(from.clone()));
                Outcome::Handled { unicast: 0, broadcast }
            }
            Err(RegistryError::NotFound(_) | RegistryError::AlreadyRegistered(_)) => {
                debug!(conn_id = %from, "closed connection had no session");
                Outcome::Handled { unicast: 0, broadcast: 0 }
            }
        }
    }

    fn join_operator(&self, from: &ConnectionId) -> Outcome {
        self.channel.join_operator_group(from);
        info!(conn_id = %from, "operator joined");
        let snapshot = OutboundEvent::AdminInit(self.registry.snapshot());
        let unicast = usize::from(self.channel.unicast(from, &snapshot));
        Outcome::Handled { unicast, broadcast: 0 }
    }

    fn join_user(&self, from: &ConnectionId) -> Outcome {
        let session = match self.registry.register(from) {
            Ok(session) => session,
            Err(_) => return Outcome::Dropped(DropReason::AlreadyRegistered),
        };
        info!(conn_id = %from, session_token = %session.session_token, "user registered");
        self.record_session_count();

        let init = OutboundEvent::UserInit(UserInit {
            uuid: session.session_token.clone(),
        });
        let unicast = usize::from(self.channel.unicast(from, &init));
        let broadcast = self
            .channel
            .broadcast_to_operators(&OutboundEvent::UserConnected(session));
        Outcome::Handled { unicast, broadcast }
    }

    fn user_message(&self, from: &ConnectionId, text: String) -> Outcome {
        let Ok(message) = self.registry.append_message(from, Sender::User, text) else {
            return Outcome::Dropped(DropReason::NoSession);
        };
        counter!("relay_messages_total", "sender" => "user").increment(1);
        let event = OutboundEvent::NewMessage(NewMessage::Routed(RoutedMessage {
            user_id: from.clone(),
            message,
        }));
        let broadcast = self.channel.broadcast_to_operators(&event);
        Outcome::Handled { unicast: 0, broadcast }
    }

    fn operator_message(&self, from: &ConnectionId, target: &ConnectionId, text: String) -> Outcome {
        if !self.channel.is_operator(from) {
            debug!(conn_id = %from, target = %target, "reply from connection outside the operator group");
        }
        let Ok(message) = self.registry.append_message(target, Sender::Operator, text) else {
            return Outcome::Dropped(DropReason::UnknownTarget);
        };
        counter!("relay_messages_total", "sender" => "operator").increment(1);
        let direct = OutboundEvent::NewMessage(NewMessage::Direct(message.clone()));
        let unicast = usize::from(self.channel.unicast(target, &direct));
        let echo = OutboundEvent::AdminSentMessage(RoutedMessage {
            user_id: target.clone(),
            message,
        });
        let broadcast = self.channel.broadcast_to_operators(&echo);
        Outcome::Handled { unicast, broadcast }
    }

    fn record_session_count(&self) {
        gauge!("relay_sessions_active").set(self.registry.len() as f64);
    }
}
