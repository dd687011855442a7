use axum::routing::get;
use axum::{middleware, Router};

use crate::state::AppState;
use crate::websocket::handlers::ws_handler;

pub mod messages;
use messages::get_message_history;

pub fn build_router(state: AppState) -> Router {
    // Service introspection endpoints (no auth, for healthchecks)
    let introspection = Router::new().route("/health", get(|| async { "OK" }));

    // API v1 endpoints behind bearer-token auth
    let api_v1 = Router::new()
        .route(
            "/conversations/:user_a/:user_b/messages",
            get(get_message_history),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ))
        // WebSocket handshake authenticates out-of-band (query/header token),
        // so it sits next to the secured routes rather than behind the layer.
        .route("/ws", get(ws_handler));

    let router = introspection.merge(Router::new().nest("/api/v1", api_v1));

    crate::middleware::with_defaults(router).with_state(state)
}
