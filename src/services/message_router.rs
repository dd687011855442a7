use tracing::error;

use crate::error::AppError;
use crate::models::conversation::ConversationKey;
use crate::models::message::Message;
use crate::models::UserId;
use crate::store::ConversationStore;
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::SessionRegistry;

pub struct MessageRouter;

impl MessageRouter {
    /// Stamp, persist and fan out one outbound message.
    ///
    /// `sender` is the identity authenticated at handshake, never a
    /// client-supplied field. Exactly one message is appended per successful
    /// call; the live deliveries afterwards are independent best-effort
    /// sends and never unwind the append.
    pub async fn route(
        store: &ConversationStore,
        registry: &SessionRegistry,
        sender: &UserId,
        receiver: &UserId,
        content: serde_json::Value,
    ) -> Result<Message, AppError> {
        if receiver.is_empty() {
            return Err(AppError::MissingReceiver);
        }

        let key = ConversationKey::derive(sender, receiver);
        let message = store
            .append(&key, sender.clone(), receiver.clone(), content)
            .await?;

        let event = WsOutboundEvent::MessageNew {
            message: message.clone(),
        };
        match serde_json::to_string(&event) {
            Ok(payload) => {
                registry.broadcast(receiver, &payload).await;
                // Echo to the sender's own sessions; a self-conversation
                // already got its delivery above.
                if sender != receiver {
                    registry.broadcast(sender, &payload).await;
                }
            }
            Err(e) => {
                error!(message_id = %message.id, error = %e, "failed to serialize message event");
            }
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::SessionId;

    fn uid(s: &str) -> UserId {
        UserId::try_from(s).unwrap()
    }

    fn setup() -> (ConversationStore, SessionRegistry) {
        (ConversationStore::new(100), SessionRegistry::new())
    }

    #[tokio::test]
    async fn empty_receiver_appends_and_broadcasts_nothing() {
        let (store, registry) = setup();
        let sender = uid("u1");
        let mut rx = registry.join(&sender, SessionId::new()).await;

        let err = MessageRouter::route(
            &store,
            &registry,
            &sender,
            &uid(""),
            serde_json::json!("hi"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::MissingReceiver));
        let key = ConversationKey::derive(&sender, &uid(""));
        assert!(store.history(&key).await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn route_appends_once_and_fans_out() {
        let (store, registry) = setup();
        let u1 = uid("u1");
        let u2 = uid("u2");
        let mut rx_sender = registry.join(&u1, SessionId::new()).await;
        let mut rx_receiver = registry.join(&u2, SessionId::new()).await;

        let message = MessageRouter::route(
            &store,
            &registry,
            &u1,
            &u2,
            serde_json::json!({ "text": "hi" }),
        )
        .await
        .unwrap();

        assert_eq!(message.sender_id, u1);
        assert_eq!(message.receiver_id, u2);

        for rx in [&mut rx_receiver, &mut rx_sender] {
            let frame = rx.recv().await.unwrap();
            let evt: WsOutboundEvent = serde_json::from_str(&frame).unwrap();
            match evt {
                WsOutboundEvent::MessageNew { message: delivered } => {
                    assert_eq!(delivered.id, message.id);
                    assert_eq!(delivered.sender_id, u1);
                }
                other => panic!("unexpected event: {other:?}"),
            }
            assert!(rx.try_recv().is_err(), "one delivery per session per call");
        }

        let history = store.history(&ConversationKey::derive(&u1, &u2)).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, message.id);
    }

    #[tokio::test]
    async fn self_conversation_delivers_once() {
        let (store, registry) = setup();
        let u1 = uid("u1");
        let mut rx = registry.join(&u1, SessionId::new()).await;

        MessageRouter::route(&store, &registry, &u1, &u1, serde_json::json!("note"))
            .await
            .unwrap();

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_receiver_still_persists() {
        let (store, registry) = setup();
        let u1 = uid("u1");
        let u2 = uid("u2");

        MessageRouter::route(&store, &registry, &u1, &u2, serde_json::json!("hi"))
            .await
            .unwrap();

        assert_eq!(
            store.history(&ConversationKey::derive(&u1, &u2)).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn storage_fault_suppresses_broadcast() {
        let store = ConversationStore::new(1);
        let registry = SessionRegistry::new();
        let u1 = uid("u1");
        let u2 = uid("u2");
        let mut rx = registry.join(&u2, SessionId::new()).await;

        MessageRouter::route(&store, &registry, &u1, &u2, serde_json::json!("first"))
            .await
            .unwrap();
        let _ = rx.recv().await;

        let err = MessageRouter::route(&store, &registry, &u1, &u2, serde_json::json!("second"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn per_key_order_matches_route_order() {
        let (store, registry) = setup();
        let u1 = uid("u1");
        let u2 = uid("u2");

        for i in 0..10 {
            MessageRouter::route(&store, &registry, &u1, &u2, serde_json::json!(i))
                .await
                .unwrap();
        }

        let history = store.history(&ConversationKey::derive(&u1, &u2)).await;
        let contents: Vec<i64> = history
            .iter()
            .map(|m| m.content.as_i64().unwrap())
            .collect();
        assert_eq!(contents, (0..10).collect::<Vec<i64>>());
    }
}
