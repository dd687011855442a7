use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::conversation::ConversationKey;
use crate::models::message::Message;
use crate::models::UserId;

/// In-memory, append-only conversation logs keyed by `ConversationKey`.
///
/// The outer map is only touched to look up (or create) a log handle; all
/// appends and reads serialize on the per-conversation mutex, so unrelated
/// conversations never contend and per-key append order is exactly the order
/// `append` calls complete.
#[derive(Clone)]
pub struct ConversationStore {
    logs: Arc<RwLock<HashMap<ConversationKey, Arc<Mutex<Vec<Message>>>>>>,
    max_conversation_len: usize,
}

impl ConversationStore {
    pub fn new(max_conversation_len: usize) -> Self {
        Self {
            logs: Arc::new(RwLock::new(HashMap::new())),
            max_conversation_len,
        }
    }

    async fn log_handle(&self, key: &ConversationKey) -> Arc<Mutex<Vec<Message>>> {
        {
            let guard = self.logs.read().await;
            if let Some(log) = guard.get(key) {
                return log.clone();
            }
        }
        let mut guard = self.logs.write().await;
        guard.entry(key.clone()).or_default().clone()
    }

    /// Append a message to the log for `key`, stamping id, sequence number
    /// and creation timestamp inside the per-key critical section.
    ///
    /// All-or-nothing: a full log rejects the message without touching it.
    pub async fn append(
        &self,
        key: &ConversationKey,
        sender_id: UserId,
        receiver_id: UserId,
        content: serde_json::Value,
    ) -> Result<Message, AppError> {
        let log = self.log_handle(key).await;
        let mut log = log.lock().await;
        if log.len() >= self.max_conversation_len {
            return Err(AppError::Storage(format!(
                "conversation {} is at capacity ({} messages)",
                key, self.max_conversation_len
            )));
        }
        let message = Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content,
            sequence_number: log.len() as i64 + 1,
            created_at: chrono::Utc::now(),
        };
        log.push(message.clone());
        Ok(message)
    }

    /// Snapshot of the log for `key` in append order; empty for an unknown
    /// key. Appends after the call are not visible in the returned Vec.
    pub async fn history(&self, key: &ConversationKey) -> Vec<Message> {
        let handle = {
            let guard = self.logs.read().await;
            guard.get(key).cloned()
        };
        match handle {
            Some(log) => log.lock().await.clone(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::try_from(s).unwrap()
    }

    fn key() -> ConversationKey {
        ConversationKey::derive(&uid("u1"), &uid("u2"))
    }

    #[tokio::test]
    async fn history_of_unknown_key_is_empty() {
        let store = ConversationStore::new(100);
        assert!(store.history(&key()).await.is_empty());
    }

    #[tokio::test]
    async fn append_stamps_and_preserves_order() {
        let store = ConversationStore::new(100);
        for i in 0..5i64 {
            let msg = store
                .append(
                    &key(),
                    uid("u1"),
                    uid("u2"),
                    serde_json::json!({ "text": format!("m{i}") }),
                )
                .await
                .unwrap();
            assert_eq!(msg.sequence_number, i + 1);
        }
        let history = store.history(&key()).await;
        assert_eq!(history.len(), 5);
        for (i, msg) in history.iter().enumerate() {
            assert_eq!(msg.sequence_number, i as i64 + 1);
            assert_eq!(msg.content["text"], format!("m{i}"));
        }
    }

    #[tokio::test]
    async fn history_is_a_snapshot() {
        let store = ConversationStore::new(100);
        store
            .append(&key(), uid("u1"), uid("u2"), serde_json::json!("a"))
            .await
            .unwrap();
        let snapshot = store.history(&key()).await;
        store
            .append(&key(), uid("u1"), uid("u2"), serde_json::json!("b"))
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.history(&key()).await.len(), 2);
    }

    #[tokio::test]
    async fn full_log_rejects_append() {
        let store = ConversationStore::new(2);
        for _ in 0..2 {
            store
                .append(&key(), uid("u1"), uid("u2"), serde_json::json!("x"))
                .await
                .unwrap();
        }
        let err = store
            .append(&key(), uid("u1"), uid("u2"), serde_json::json!("y"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(store.history(&key()).await.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_appends_serialize_per_key() {
        let store = ConversationStore::new(1000);
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(
                        &key(),
                        uid("u1"),
                        uid("u2"),
                        serde_json::json!(i),
                    )
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let history = store.history(&key()).await;
        assert_eq!(history.len(), 20);
        let sequences: Vec<i64> = history.iter().map(|m| m.sequence_number).collect();
        assert_eq!(sequences, (1..=20).collect::<Vec<i64>>());
    }
}
