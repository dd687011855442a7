use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::UserId;

/// Inbound WebSocket events from client to server.
///
/// There is deliberately no sender field on `message.send`: the sender is
/// always the identity authenticated at handshake.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    /// Request to join the session's own broadcast group. The server honors
    /// it only when `user_id` matches the identity bound at handshake.
    #[serde(rename = "join")]
    Join { user_id: UserId },

    #[serde(rename = "message.send")]
    MessageSend {
        receiver_id: UserId,
        #[serde(default)]
        content: serde_json::Value,
    },
}

/// Outbound WebSocket events from server to client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    #[serde(rename = "joined")]
    Joined { user_id: UserId },

    /// A stamped message, delivered once per target session (receiver's
    /// group plus the sender's own sessions).
    #[serde(rename = "message.new")]
    MessageNew { message: Message },

    #[serde(rename = "error")]
    Error { code: String, message: String },
}
