//! Pending-session bridge for two-phase streaming.
//!
//! A client first posts its prompt, receives an opaque session id, then opens
//! the event stream with that id. The prompt is handed over exactly once.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{PipelineError, PipelineResult};

/// A prompt waiting for its streaming read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSession {
    pub conversation_id: Option<i64>,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory store of pending sessions keyed by session id.
#[derive(Debug, Clone)]
pub struct PendingSessionStore {
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<Uuid, PendingSession>>>,
}

impl PendingSessionStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(365)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a prompt and return the session id that claims it.
    #[instrument(skip_all, fields(conversation_id = ?conversation_id))]
    pub async fn open(&self, conversation_id: Option<i64>, prompt: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        let session = PendingSession {
            conversation_id,
            prompt: prompt.into(),
            created_at: Utc::now(),
        };

        let mut sessions = self.sessions.write().await;
        let expired = purge(&mut sessions, self.ttl);
        if expired > 0 {
            debug!(expired, "Dropped expired pending sessions");
        }
        sessions.insert(id, session);
        debug!(session_id = %id, "Pending session opened");
        id
    }

    /// Claim the prompt for `id`.
    ///
    /// The session is removed whether or not the claim succeeds.
    ///
    /// # Errors
    /// `MalformedHistory` when the session is unknown, already claimed,
    /// expired, or was opened for a different conversation.
    pub async fn claim(&self, id: Uuid, conversation_id: Option<i64>) -> PipelineResult<String> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| bridge_error(format!("no pending session {id}")))?;

        if Utc::now() - session.created_at >= self.ttl {
            warn!(session_id = %id, "Pending session expired before it was read");
            return Err(bridge_error(format!("pending session {id} has expired")));
        }

        if session.conversation_id != conversation_id {
            warn!(
                session_id = %id,
                expected = ?session.conversation_id,
                got = ?conversation_id,
                "Pending session read for the wrong conversation"
            );
            return Err(bridge_error(format!(
                "pending session {id} does not belong to the requested conversation"
            )));
        }

        Ok(session.prompt)
    }

    /// Number of sessions still waiting, expired ones included.
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn purge(sessions: &mut HashMap<Uuid, PendingSession>, ttl: Duration) -> usize {
    let now = Utc::now();
    let before = sessions.len();
    sessions.retain(|_, session| now - session.created_at < ttl);
    before - sessions.len()
}

fn bridge_error(reason: String) -> PipelineError {
    PipelineError::MalformedHistory(reason)
}
