//! Operational endpoints every teacher-style service carries alongside its
//! domain routes: a metrics snapshot and a static description of the API
//! surface.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /metrics` — flat JSON counters, not a Prometheus exporter.
pub async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "rooms_active": state.rooms.room_count(),
        "connections_active": state.rooms.total_connections(),
        "cache_hits": state.metrics.cache_hits(),
        "cache_misses": state.metrics.cache_misses(),
        "fallback_invocations": state.metrics.fallback_invocations(),
        "command_cache_size": state.cache.len(),
    }))
}

/// `GET /v1/openapi.json` — static description of the routes below, kept
/// by hand rather than generated.
pub async fn openapi_spec() -> Json<Value> {
    Json(json!({
        "openapi": "3.0.3",
        "info": { "title": "ib-gateway", "version": env!("CARGO_PKG_VERSION") },
        "paths": {
            "/health": { "get": { "summary": "Liveness and basic counters" } },
            "/metrics": { "get": { "summary": "Process-level counters" } },
            "/v1/openapi.json": { "get": { "summary": "This document" } },
            "/ws/{room_id}": { "get": { "summary": "Upgrade to the room's WebSocket relay" } },
            "/api/ai": { "post": { "summary": "Run one natural-language board command" } },
            "/api/ai/stream": { "post": { "summary": "Same as /api/ai, streamed as Server-Sent Events" } }
        }
    }))
}
