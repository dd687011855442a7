use axum::http;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::state::AppState;

/// Add HTTP trace logging layer (request/response + latency).
///
/// WebSocket upgrades are flagged on the span so long-lived connections are
/// distinguishable from plain request/response pairs in the logs.
pub fn add_tracing(router: Router<AppState>) -> Router<AppState> {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let path = req.uri().path().to_string();
                let upgrade = req.headers().contains_key(http::header::UPGRADE);
                tracing::span!(Level::INFO, "request", %method, %path, upgrade)
            })
            .on_response(
                |res: &http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    let status = res.status();
                    let elapsed_ms = latency.as_millis() as u64;
                    if status.is_server_error() {
                        tracing::error!(%status, elapsed_ms, "request failed");
                    } else if status.is_client_error() {
                        tracing::warn!(%status, elapsed_ms, "request rejected");
                    } else {
                        tracing::info!(%status, elapsed_ms, "request completed");
                    }
                },
            ),
    )
}
