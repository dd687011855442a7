use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    /// Opaque to the routing layer; clients decide the shape.
    pub content: serde_json::Value,
    /// Position within the conversation log, starting at 1.
    pub sequence_number: i64,
    pub created_at: DateTime<Utc>,
}
