use crate::ids::ConnectionId;

/// Registry conditions. Never surfaced to a client; the router drops the
/// triggering event and moves on.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no live session for connection {0}")]
    NotFound(ConnectionId),

    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}

/// Failure to decode an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed event frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not valid UTF-8")]
    NotUtf8,
}
