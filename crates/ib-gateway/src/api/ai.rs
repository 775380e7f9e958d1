//! HTTP surface for the AI Orchestrator: a synchronous endpoint and an
//! SSE streaming endpoint sharing the same request shape.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use ib_domain::stream::StreamEvent;

use crate::cancel::CancelToken;
use crate::orchestrator;
use crate::security;
use crate::state::AppState;

const STREAM_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_ROOM: &str = "default";

#[derive(Debug, Deserialize)]
pub struct AiRequest {
    pub message: String,
    #[serde(default, rename = "boardId")]
    pub board_id: Option<String>,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

/// `POST /api/ai` — run the orchestrator to completion, return its result.
pub async fn ai(
    State(state): State<AppState>,
    Json(body): Json<AiRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !security::is_ai_message_valid(&body.message, state.config.security.max_ai_message_chars) {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must be 1..=2000 chars"));
    }

    let room_id = body.board_id.clone().unwrap_or_else(|| DEFAULT_ROOM.to_string());
    let room = state
        .rooms
        .get_or_create(&room_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let cancel = CancelToken::new();
    let result = orchestrator::run(
        &room,
        &state.cache,
        state.model.as_deref(),
        &body.message,
        state.config.security.max_objects_per_room,
        &cancel,
        &state.metrics,
        |_event| {},
    )
    .await;

    Ok(Json(json!({
        "message": result.message,
        "actions": result.actions,
        "cached": result.cached,
    })))
}

/// `POST /api/ai/stream` — same request, Server-Sent-Events response.
/// Stays open until `done`/`error` is emitted, the client disconnects, or
/// 60 seconds elapse, whichever comes first.
pub async fn ai_stream(
    State(state): State<AppState>,
    Json(body): Json<AiRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    if !security::is_ai_message_valid(&body.message, state.config.security.max_ai_message_chars) {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must be 1..=2000 chars"));
    }

    let room_id = body.board_id.clone().unwrap_or_else(|| DEFAULT_ROOM.to_string());
    let room = state
        .rooms
        .get_or_create(&room_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let (tx, rx) = mpsc::channel::<StreamEvent>(32);
    let cancel = CancelToken::new();
    let cancel_for_timeout = cancel.clone();
    let message = body.message.clone();
    let max_objects_per_room = state.config.security.max_objects_per_room;
    let cache = state.cache.clone();
    let model = state.model.clone();
    let metrics = state.metrics.clone();

    tokio::spawn(async move {
        let run_fut = orchestrator::run(
            &room,
            &cache,
            model.as_deref(),
            &message,
            max_objects_per_room,
            &cancel,
            &metrics,
            move |event| {
                let _ = tx.try_send(event);
            },
        );
        tokio::pin!(run_fut);

        tokio::select! {
            _ = &mut run_fut => {}
            _ = tokio::time::sleep(STREAM_TIMEOUT) => {
                cancel_for_timeout.cancel();
            }
        }
    });

    let stream = async_stream::stream! {
        let mut rx = rx;
        while let Some(event) = rx.recv().await {
            let payload = serde_json::to_string(&event).unwrap_or_default();
            yield Ok::<Event, Infallible>(Event::default().data(payload));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
