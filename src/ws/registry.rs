//! Live-session registry.
//!
//! Tracks which relay sessions are currently open so the health endpoint
//! can report an active-connection count. Sessions are otherwise fully
//! isolated; nothing here is on the per-message path.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use std::sync::Arc;

/// Registry of open sessions, safe for concurrent use without locking in
/// caller code.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionInfo>,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub connected_at: DateTime<Utc>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session. The returned guard unregisters on drop, so
    /// every exit path of a connection task cleans up.
    pub fn register(self: &Arc<Self>) -> SessionGuard {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            SessionInfo {
                connected_at: Utc::now(),
            },
        );
        SessionGuard {
            id,
            registry: self.clone(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

/// RAII handle for one registered session.
#[derive(Debug)]
pub struct SessionGuard {
    id: Uuid,
    registry: Arc<SessionRegistry>,
}

impl SessionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.sessions.remove(&self.id);
    }
}
