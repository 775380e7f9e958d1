use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "rooms": state.rooms.room_count(),
        "persistence": state.config.rooms.sqlite_path.is_some(),
        "command_cache_size": state.cache.len(),
    }))
}
