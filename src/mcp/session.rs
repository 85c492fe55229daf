//! Streaming session bookkeeping.
//!
//! Sessions are correlation handles for one long-lived event stream. They
//! live in memory only and disappear on restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Bearer token captured when the channel was opened.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub initialized: bool,
    pub client_info: Option<Value>,
}

/// Fields to change on [`SessionManager::touch`]. Unset fields are kept.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub token: Option<String>,
    pub initialized: Option<bool>,
    pub client_info: Option<Value>,
}

#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens a session and returns its id (a random v4 UUID).
    pub fn create(&self, token: Option<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = Session {
            id: id.clone(),
            created_at: now,
            last_activity: now,
            token: token.filter(|t| !t.trim().is_empty()),
            initialized: false,
            client_info: None,
        };
        self.lock().insert(id.clone(), session);
        debug!(session_id = %id, "Session created");
        id
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.lock().get(session_id).cloned()
    }

    pub fn exists(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Applies `update` and refreshes `last_activity`, which never moves
    /// backwards.
    pub fn touch(&self, session_id: &str, update: SessionUpdate) -> Result<Session, SessionError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;

        if let Some(token) = update.token.filter(|t| !t.trim().is_empty()) {
            session.token = Some(token);
        }
        if let Some(initialized) = update.initialized {
            session.initialized = initialized;
        }
        if let Some(client_info) = update.client_info {
            session.client_info = Some(client_info);
        }
        session.last_activity = session.last_activity.max(Utc::now());

        Ok(session.clone())
    }

    /// Removes a session. Unknown ids are ignored.
    pub fn destroy(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id).is_some();
        if removed {
            debug!(session_id = %session_id, "Session destroyed");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

/// Destroys its session when dropped. Held by an idle event stream so that a
/// client disconnect (which drops the stream) cleans up the session.
pub struct SessionGuard {
    manager: Arc<SessionManager>,
    session_id: String,
}

impl SessionGuard {
    pub fn new(manager: Arc<SessionManager>, session_id: String) -> Self {
        Self {
            manager,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_alive(&self) -> bool {
        self.manager.exists(&self.session_id)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.destroy(&self.session_id);
    }
}
