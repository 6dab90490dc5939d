use serde::Serialize;

use crate::ids::{ConnectionId, SessionToken};

/// Origin of a relayed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Operator,
}

/// One message of a conversation. Immutable once accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    /// Unix epoch milliseconds, assigned by the server on acceptance.
    pub time: i64,
}

/// Conversation state for one registered user connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    #[serde(rename = "socketId")]
    pub connection_id: ConnectionId,
    #[serde(rename = "uuid")]
    pub session_token: SessionToken,
    pub messages: Vec<Message>,
    #[serde(rename = "timestamp")]
    pub created_at: i64,
}

impl Session {
    pub(crate) fn new(connection_id: ConnectionId, now: i64) -> Self {
        Self {
            connection_id,
            session_token: SessionToken::generate(),
            messages: Vec::new(),
            created_at: now,
        }
    }

    /// Append a message, keeping times non-decreasing even if the wall clock
    /// stepped backwards since the previous append.
    pub(crate) fn push(&mut self, sender: Sender, text: String, now: i64) -> Message {
        let time = self.messages.last().map_or(now, |last| last.time.max(now));
        let message = Message { sender, text, time };
        self.messages.push(message.clone());
        message
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Sender::Operator).unwrap(), "\"operator\"");
    }

    #[test]
    fn session_wire_field_names() {
        let session = Session::new(ConnectionId::from_raw("c1"), 1_700_000_000_000);
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["socketId"], "c1");
        assert!(json["uuid"].is_string());
        assert!(json["messages"].as_array().unwrap().is_empty());
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
    }

    #[test]
    fn push_keeps_times_monotonic_when_clock_steps_back() {
        let mut session = Session::new(ConnectionId::from_raw("c1"), 0);
        let first = session.push(Sender::User, "a".into(), 2_000);
        let second = session.push(Sender::User, "b".into(), 1_000);
        assert_eq!(first.time, 2_000);
        assert_eq!(second.time, 2_000);
        let third = session.push(Sender::Operator, "c".into(), 3_000);
        assert_eq!(third.time, 3_000);
    }

    #[test]
    fn push_returns_the_stored_message() {
        let mut session = Session::new(ConnectionId::from_raw("c1"), 0);
        let msg = session.push(Sender::User, "hello".into(), 5);
        assert_eq!(session.messages, vec![msg]);
    }
}
