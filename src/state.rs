use crate::{config::Config, store::ConversationStore, websocket::SessionRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub store: ConversationStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            store: ConversationStore::new(config.max_conversation_len),
            config,
        }
    }
}
