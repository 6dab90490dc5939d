use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::errors::RegistryError;
use crate::ids::ConnectionId;
use crate::messages::{now_millis, Message, Sender, Session};

/// Authoritative store of live sessions, keyed by connection.
///
/// One lock guards the whole map, so each operation is a single critical
/// section and read-modify-write calls never interleave on a key.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session for `connection_id`.
    ///
    /// A second registration for the same connection leaves the existing
    /// session (token and history) untouched and returns `AlreadyRegistered`.
    pub fn register(&self, connection_id: &ConnectionId) -> Result<Session, RegistryError> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(connection_id) {
            return Err(RegistryError::AlreadyRegistered(connection_id.clone()));
        }
        let session = Session::new(connection_id.clone(), now_millis());
        let _ = sessions.insert(connection_id.clone(), session.clone());
        Ok(session)
    }

    /// Copy of the session for `connection_id`.
    pub fn get(&self, connection_id: &ConnectionId) -> Result<Session, RegistryError> {
        self.sessions
            .lock()
            .get(connection_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(connection_id.clone()))
    }

    /// Stamp and append a message to the session's log.
    pub fn append_message(
        &self,
        connection_id: &ConnectionId,
        sender: Sender,
        text: impl Into<String>,
    ) -> Result<Message, RegistryError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(connection_id)
            .ok_or_else(|| RegistryError::NotFound(connection_id.clone()))?;
        Ok(session.push(sender, text.into(), now_millis()))
    }

    /// Delete the session and return it. `NotFound` if none exists.
    pub fn remove(&self, connection_id: &ConnectionId) -> Result<Session, RegistryError> {
        self.sessions
            .lock()
            .remove(connection_id)
            .ok_or_else(|| RegistryError::NotFound(connection_id.clone()))
    }

    /// Full copy of every live session, ordered by connection id.
    pub fn snapshot(&self) -> BTreeMap<ConnectionId, Session> {
        self.sessions
            .lock()
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect()
    }

    /// Whether `connection_id` has a live session.
    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.lock().contains_key(connection_id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
