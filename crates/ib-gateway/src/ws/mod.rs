//! Connection Hub — component **C4**.
//!
//! One WebSocket connection per client, addressed at `/ws/:room_id`. The
//! per-connection state machine from the spec (`Opening → Validating →
//! Joining → Active → Closing`) maps onto this module as: `Validating`
//! happens in [`ws_upgrade`] before the upgrade is accepted; `Joining`
//! and `Active` run inside [`handle_socket`]; `Closing` is the fall-through
//! at the bottom of its read loop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use ib_rooms::RoomHandle;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::check_token;
use crate::security;
use crate::state::AppState;

const OUTBOUND_BUFFER: usize = 64;
const TAG_DELTA: u8 = 0;
const TAG_AWARENESS: u8 = 1;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// `GET /ws/:room_id` — upgrade to a WebSocket joined to `room_id`.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !security::is_valid_room_name(&room_id) {
        return (axum::http::StatusCode::BAD_REQUEST, "invalid room id").into_response();
    }

    let origin = headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok());
    if !security::is_origin_allowed(origin, &state.config.security.allowed_origins) {
        return (axum::http::StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    let provided = query
        .token
        .clone()
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .unwrap_or_default();
    if !check_token(state.api_token.as_deref(), &provided) {
        return (axum::http::StatusCode::UNAUTHORIZED, "invalid or missing token").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id)).into_response()
}

async fn handle_socket(socket: WebSocket, state: AppState, room_id: String) {
    let room = match state.rooms.get_or_create(&room_id).await {
        Ok(room) => room,
        Err(e) => {
            tracing::warn!(room_id, error = %e, "failed to load room, closing connection");
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();

    let state_bytes = room.doc.encode_state();
    let mut initial_frame = Vec::with_capacity(1 + state_bytes.len());
    initial_frame.push(TAG_DELTA);
    initial_frame.extend_from_slice(&state_bytes);
    if sink.send(Message::Binary(initial_frame)).await.is_err() {
        return;
    }

    let connection_id = state.rooms.next_connection_id();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_BUFFER);
    room.register_connection(connection_id, outbound_tx);

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Binary(frame)).await.is_err() {
                break;
            }
        }
    });

    let max_frame_bytes = state.config.security.max_frame_bytes;
    let max_objects_per_room = state.config.security.max_objects_per_room;

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Binary(bytes) => {
                handle_frame(&room, connection_id, bytes, max_frame_bytes, max_objects_per_room);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    writer.abort();
    room.remove_connection(connection_id);
    tracing::debug!(room_id, connection_id, "connection closed");
}

/// Route one inbound wire frame per §4.3. Frames shorter than 2 bytes or
/// larger than the size limit are dropped; the connection stays open.
fn handle_frame(
    room: &Arc<RoomHandle>,
    connection_id: ib_rooms::ConnectionId,
    bytes: Vec<u8>,
    max_frame_bytes: usize,
    max_objects_per_room: usize,
) {
    if bytes.len() < 2 {
        return;
    }
    if !security::is_ws_message_within_limit(bytes.len(), max_frame_bytes) {
        tracing::warn!(connection_id, len = bytes.len(), "dropping oversize frame");
        return;
    }

    room.touch();
    match bytes[0] {
        TAG_DELTA => {
            if !security::can_add_object(room.doc.object_count(), max_objects_per_room) {
                return;
            }
            let payload = &bytes[1..];
            if let Err(e) = room.doc.apply_remote_update(payload) {
                tracing::debug!(connection_id, error = %e, "dropping malformed delta frame");
                return;
            }
            room.mark_dirty();
            room.broadcast(bytes, Some(connection_id));
        }
        TAG_AWARENESS => {
            room.broadcast(bytes, Some(connection_id));
        }
        other => {
            tracing::debug!(connection_id, tag = other, "ignoring frame with unknown tag");
        }
    }
}
