//! Session registry.
//!
//! Tracks the sessions created by this process so lookups can answer "did
//! we create this". It is not the source of truth for session validity (the
//! video platform is) and is not persisted: a restart forgets everything.
//!
//! The [`SessionStore`] trait is the seam for replacing the in-memory map
//! with a shared store when more than one broker instance is deployed.

use crate::models::Session;
use common::types::SessionId;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Lookup interface over created sessions.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a newly created session.
    async fn insert(&self, session: Session);

    /// Fetch a session created by this process, if any.
    async fn get(&self, id: &SessionId) -> Option<Session>;

    /// Number of sessions recorded.
    async fn count(&self) -> usize;
}

/// In-memory session registry guarded by an async `RwLock`.
///
/// Concurrent inserts serialize on the write lock; provider-assigned ids are
/// unique, so a repeated id simply overwrites its own entry.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        debug!(target: "vb.registry", session_id = %session.id, "Recording session");
        sessions.insert(session.id.clone(), session);
    }

    async fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
