use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use crate::error::AppError;
use crate::middleware::auth::{bearer_token, verify_token, Claims};
use crate::models::UserId;
use crate::services::message_router::MessageRouter;
use crate::state::AppState;
use crate::websocket::message_types::{WsInboundEvent, WsOutboundEvent};
use crate::websocket::SessionId;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Handshake authentication: credential from the query string or the
/// `Authorization` header, verified before the upgrade is accepted. A
/// missing or invalid credential refuses the connection; there is no
/// anonymous fallback.
fn authenticate_handshake(
    params: &WsParams,
    headers: &HeaderMap,
    secret: &str,
) -> Result<Claims, AppError> {
    let token = params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .map(|s| s.to_string())
    });

    match token {
        None => Err(AppError::MissingCredentials),
        Some(t) => verify_token(&t, secret),
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let claims = match authenticate_handshake(&params, &headers, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, "websocket connection rejected");
            return e.into_response();
        }
    };

    let user_id = match claims.user_id() {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!(error = %e, "websocket connection rejected");
            return e.into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket))
}

enum Step {
    Deliver(String),
    Client(Option<Result<Message, axum::Error>>),
    Stop,
}

/// Per-connection task. Owns the session's identity binding and its registry
/// membership; cleanup on any exit path removes the session from its group.
async fn handle_socket(state: AppState, user_id: UserId, socket: WebSocket) {
    let session_id = SessionId::new();
    let (mut sink, mut stream) = socket.split();
    // None until the client joins its own broadcast group.
    let mut group_rx: Option<UnboundedReceiver<String>> = None;

    loop {
        let step = match group_rx.as_mut() {
            Some(rx) => tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(frame) => Step::Deliver(frame),
                    None => Step::Stop,
                },
                incoming = stream.next() => Step::Client(incoming),
            },
            None => Step::Client(stream.next().await),
        };

        match step {
            Step::Deliver(frame) => {
                if sink.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            Step::Stop => break,
            Step::Client(incoming) => match incoming {
                Some(Ok(Message::Text(txt))) => match serde_json::from_str::<WsInboundEvent>(&txt)
                {
                    Ok(evt) => {
                        if !handle_event(&state, &user_id, session_id, evt, &mut group_rx, &mut sink)
                            .await
                        {
                            break;
                        }
                    }
                    Err(_) => {
                        let ok = send_event(
                            &mut sink,
                            &WsOutboundEvent::Error {
                                code: "bad_request".into(),
                                message: "unrecognized event".into(),
                            },
                        )
                        .await;
                        if !ok {
                            break;
                        }
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong handled by the framework
                Some(Err(_)) => break,
            },
        }
    }

    state.registry.leave(&user_id, session_id).await;
}

/// Returns false when the connection should be torn down.
async fn handle_event(
    state: &AppState,
    user_id: &UserId,
    session_id: SessionId,
    evt: WsInboundEvent,
    group_rx: &mut Option<UnboundedReceiver<String>>,
    sink: &mut SplitSink<WebSocket, Message>,
) -> bool {
    match evt {
        WsInboundEvent::Join { user_id: requested } => {
            // A session may only join the group matching its own
            // authenticated identity.
            if &requested != user_id {
                warn!(
                    authenticated = %user_id,
                    requested = %requested,
                    "rejected join for foreign identity"
                );
                return send_event(
                    sink,
                    &WsOutboundEvent::Error {
                        code: AppError::Forbidden.code().into(),
                        message: "cannot join another user's group".into(),
                    },
                )
                .await;
            }
            if group_rx.is_none() {
                *group_rx = Some(state.registry.join(user_id, session_id).await);
            }
            send_event(
                sink,
                &WsOutboundEvent::Joined {
                    user_id: user_id.clone(),
                },
            )
            .await
        }
        WsInboundEvent::MessageSend {
            receiver_id,
            content,
        } => {
            match MessageRouter::route(&state.store, &state.registry, user_id, &receiver_id, content)
                .await
            {
                // Delivery to this session happens through its group channel.
                Ok(_) => true,
                Err(e) => {
                    send_event(
                        sink,
                        &WsOutboundEvent::Error {
                            code: e.code().into(),
                            message: e.to_string(),
                        },
                    )
                    .await
                }
            }
        }
    }
}

async fn send_event(sink: &mut SplitSink<WebSocket, Message>, event: &WsOutboundEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(payload) => sink.send(Message::Text(payload)).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to serialize outbound event");
            true
        }
    }
}
