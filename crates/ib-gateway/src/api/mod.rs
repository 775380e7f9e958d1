pub mod admin;
pub mod ai;
pub mod health;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth;
use crate::state::AppState;
use crate::ws;

/// Build the full API router. Health and the WebSocket upgrade are public
/// (the WS handler does its own token check at the upgrade boundary); the
/// AI endpoints sit behind the bearer-token middleware.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(admin::metrics))
        .route("/v1/openapi.json", get(admin::openapi_spec))
        .route("/ws/:room_id", get(ws::ws_upgrade));

    let protected = Router::new()
        .route("/api/ai", post(ai::ai))
        .route("/api/ai/stream", post(ai::ai_stream))
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public.merge(protected).layer(tower_http::trace::TraceLayer::new_for_http())
}
