use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod handlers;
pub mod message_types;

use crate::models::UserId;

/// Unique identifier for one live WebSocket session.
///
/// Assigned when the connection registers; used for precise removal when the
/// connection closes, so a user's other sessions are untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// One joined session: id plus the channel feeding its outbound frames.
struct Session {
    id: SessionId,
    sender: UnboundedSender<String>,
}

/// Maps a user identity to the set of currently open sessions.
///
/// The registry owns group membership only; the underlying connection is
/// owned by the per-connection socket task. Delivery to zero sessions (user
/// offline) is the normal silently-dropped case.
#[derive(Default, Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<UserId, Vec<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `session_id` to the broadcast group for `user_id`.
    ///
    /// Returns the receiver end the socket task drains into the connection.
    /// Callers must only pass the identity bound at handshake; the spoofed
    /// join check lives in the socket handler where that binding is known.
    pub async fn join(
        &self,
        user_id: &UserId,
        session_id: SessionId,
    ) -> UnboundedReceiver<String> {
        let (tx, rx) = unbounded_channel();
        let mut guard = self.inner.write().await;
        guard.entry(user_id.clone()).or_default().push(Session {
            id: session_id,
            sender: tx,
        });
        tracing::debug!(
            user_id = %user_id,
            sessions = guard.get(user_id).map(|v| v.len()).unwrap_or(0),
            "session joined broadcast group"
        );
        rx
    }

    /// Remove `session_id` from the group for `user_id`. Idempotent; prunes
    /// groups left empty so the map does not leak identities.
    pub async fn leave(&self, user_id: &UserId, session_id: SessionId) {
        let mut guard = self.inner.write().await;
        if let Some(sessions) = guard.get_mut(user_id) {
            sessions.retain(|s| s.id != session_id);
            if sessions.is_empty() {
                guard.remove(user_id);
            }
            tracing::debug!(user_id = %user_id, "session left broadcast group");
        }
    }

    /// Deliver `payload` to every open session of `user_id`, dropping dead
    /// senders along the way. No recipients is not an error.
    pub async fn broadcast(&self, user_id: &UserId, payload: &str) {
        let mut guard = self.inner.write().await;
        if let Some(sessions) = guard.get_mut(user_id) {
            sessions.retain(|s| s.sender.send(payload.to_string()).is_ok());
            if sessions.is_empty() {
                guard.remove(user_id);
            }
        }
    }

    pub async fn session_count(&self, user_id: &UserId) -> usize {
        let guard = self.inner.read().await;
        guard.get(user_id).map(|v| v.len()).unwrap_or(0)
    }
}
