use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::conversation::ConversationKey;
use crate::models::message::Message;
use crate::models::UserId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Most-recent window size; defaults to and is capped by the configured
    /// page limit.
    pub limit: Option<usize>,
}

/// Ordered log for the conversation between `user_a` and `user_b`.
///
/// The caller must be one of the two declared participants; the key
/// derivation alone does not authorize access. A pair with no prior
/// messages yields an empty array, not an error.
pub async fn get_message_history(
    State(state): State<AppState>,
    Extension(caller): Extension<UserId>,
    Path((user_a, user_b)): Path<(UserId, UserId)>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Message>>, AppError> {
    let key = ConversationKey::derive(&user_a, &user_b);
    if !key.has_participant(&caller) {
        return Err(AppError::Forbidden);
    }

    let mut history = state.store.history(&key).await;

    let cap = state.config.history_page_limit;
    let limit = params.limit.unwrap_or(cap).min(cap);
    if history.len() > limit {
        history = history.split_off(history.len() - limit);
    }

    Ok(Json(history))
}
