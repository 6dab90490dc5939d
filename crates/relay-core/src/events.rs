//! Wire envelope for the relay protocol.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`;
//! payload-less events omit `data`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::EventError;
use crate::ids::{ConnectionId, SessionToken};
use crate::messages::{Message, Session};

/// Events a client sends to the relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "join_admin")]
    JoinOperator,

    #[serde(rename = "join_user")]
    JoinUser,

    #[serde(rename = "msg_user_to_admin")]
    UserMessage(String),

    #[serde(rename = "msg_admin_to_user")]
    OperatorMessage {
        #[serde(rename = "targetSocketId")]
        target: ConnectionId,
        text: String,
    },
}

impl InboundEvent {
    /// Decode a text frame.
    pub fn parse(frame: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Decode a binary frame carrying UTF-8 JSON.
    pub fn parse_bytes(frame: &[u8]) -> Result<Self, EventError> {
        let text = std::str::from_utf8(frame).map_err(|_| EventError::NotUtf8)?;
        Self::parse(text)
    }

    /// Wire name, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::JoinOperator => "join_admin",
            Self::JoinUser => "join_user",
            Self::UserMessage(_) => "msg_user_to_admin",
            Self::OperatorMessage { .. } => "msg_admin_to_user",
        }
    }
}

/// A message as seen by operators: which conversation it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoutedMessage {
    #[serde(rename = "userId")]
    pub user_id: ConnectionId,
    pub message: Message,
}

/// Payload of `new_message`: operators get the routed form, the user end
/// gets the bare message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NewMessage {
    Routed(RoutedMessage),
    Direct(Message),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserInit {
    pub uuid: SessionToken,
}

/// Events the relay sends to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "admin_init")]
    AdminInit(BTreeMap<ConnectionId, Session>),

    #[serde(rename = "user_init")]
    UserInit(UserInit),

    #[serde(rename = "user_connected")]
    UserConnected(Session),

    #[serde(rename = "new_message")]
    NewMessage(NewMessage),

    #[serde(rename = "admin_sent_message")]
    AdminSentMessage(RoutedMessage),

    #[serde(rename = "user_disconnected")]
    UserDisconnected(ConnectionId),
}

impl OutboundEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::AdminInit(_) => "admin_init",
            Self::UserInit(_) => "user_init",
            Self::UserConnected(_) => "user_connected",
            Self::NewMessage(_) => "new_message",
            Self::AdminSentMessage(_) => "admin_sent_message",
            Self::UserDisconnected(_) => "user_disconnected",
        }
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender;
    use serde_json::json;

    #[test]
    fn parse_join_events_without_data() {
        assert_eq!(
            InboundEvent::parse(r#"{"event":"join_admin"}"#).unwrap(),
            InboundEvent::JoinOperator
        );
        assert_eq!(
            InboundEvent::parse(r#"{"event":"join_user"}"#).unwrap(),
            InboundEvent::JoinUser
        );
    }

    #[test]
    fn parse_user_message() {
        let ev = InboundEvent::parse(r#"{"event":"msg_user_to_admin","data":"hello"}"#).unwrap();
        assert_eq!(ev, InboundEvent::UserMessage("hello".into()));
    }

    #[test]
    fn parse_operator_message() {
        let ev = InboundEvent::parse(
            r#"{"event":"msg_admin_to_user","data":{"targetSocketId":"conn_a","text":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(
            ev,
            InboundEvent::OperatorMessage {
                target: ConnectionId::from_raw("conn_a"),
                text: "hi".into(),
            }
        );
        assert_eq!(ev.event_name(), "msg_admin_to_user");
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(InboundEvent::parse(r#"{"event":"shutdown_everything"}"#).is_err());
    }

    #[test]
    fn wrong_payload_shape_is_rejected() {
        assert!(InboundEvent::parse(r#"{"event":"msg_admin_to_user","data":"hi"}"#).is_err());
        assert!(InboundEvent::parse("not json").is_err());
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        let err = InboundEvent::parse_bytes(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, EventError::NotUtf8));
        let ok = InboundEvent::parse_bytes(br#"{"event":"join_user"}"#).unwrap();
        assert_eq!(ok, InboundEvent::JoinUser);
    }

    #[test]
    fn new_message_for_operators_is_wrapped() {
        let ev = OutboundEvent::NewMessage(NewMessage::Routed(RoutedMessage {
            user_id: ConnectionId::from_raw("conn_a"),
            message: Message {
                sender: Sender::User,
                text: "hello".into(),
                time: 10,
            },
        }));
        let value: serde_json::Value = serde_json::from_str(&ev.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "new_message",
                "data": {"userId": "conn_a", "message": {"sender": "user", "text": "hello", "time": 10}}
            })
        );
    }

    #[test]
    fn new_message_for_user_is_bare() {
        let ev = OutboundEvent::NewMessage(NewMessage::Direct(Message {
            sender: Sender::Operator,
            text: "hi".into(),
            time: 11,
        }));
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["data"], json!({"sender": "operator", "text": "hi", "time": 11}));
    }

    #[test]
    fn user_disconnected_carries_plain_id() {
        let ev = OutboundEvent::UserDisconnected(ConnectionId::from_raw("conn_z"));
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value, json!({"event": "user_disconnected", "data": "conn_z"}));
        assert_eq!(ev.event_name(), "user_disconnected");
    }

    #[test]
    fn admin_init_is_keyed_by_connection() {
        let session = Session::new(ConnectionId::from_raw("conn_a"), 1);
        let mut map = BTreeMap::new();
        map.insert(session.connection_id.clone(), session);
        let value = serde_json::to_value(OutboundEvent::AdminInit(map)).unwrap();
        assert_eq!(value["event"], "admin_init");
        assert_eq!(value["data"]["conn_a"]["socketId"], "conn_a");
    }
}
