//! AI Orchestrator — component **C8**.
//!
//! Drives one natural-language command through the decision tree: a
//! cache hit replays a learned recipe; with no model configured it goes
//! straight to the local fallback parser; with a model configured it
//! loops the model call under a complexity-scaled token/turn budget,
//! dispatching each turn's tool calls before asking for the next, until
//! the model stops requesting tools or the budget runs out. A model
//! error on the very first turn falls back to the local parser; an error
//! on a later turn just ends the loop with whatever was already done.
//! Every tool call executed along the way is applied to the room's
//! document and its delta (if any) is broadcast to co-tenants exactly
//! like a client-originated frame would be.

use ib_cache::{classify, extract_params, CommandCache};
use ib_domain::stream::StreamEvent;
use ib_domain::{ToolAction, ToolInput, ToolName};
use ib_model::{CompletionRequest, ModelClient};
use ib_rooms::RoomHandle;

use crate::cancel::CancelToken;
use crate::metrics::Metrics;

const SYSTEM_PROMPT: &str = "You control a shared whiteboard. Given the user's request and the \
current board context, call createObject/updateObject/moveObject/getBoardState as needed to \
satisfy it, then summarize what you did in one short sentence. Call more tools on a later turn \
if the board context shows the request isn't fully satisfied yet; stop once it is.";

/// Complexity-driven token/turn budget for a command's model loop (§4.7).
struct TurnBudget {
    max_tokens: u32,
    max_turns: u32,
}

const COMPLEX_KEYWORDS: &[&str] = &[
    "grid", "layout", "arrange", "template", "retrospective", "swot", "journey", "kanban",
    "columns", "rows", "multiple", "chart", "diagram", "visualize", "map", "board",
    "pros and cons", "pros & cons", "matrix", "timeline", "roadmap", "workflow", "connect", "arrow",
];

fn turn_budget_for(message: &str) -> TurnBudget {
    let lower = message.to_lowercase();
    let complex = message.len() > 120 || COMPLEX_KEYWORDS.iter().any(|k| lower.contains(k));
    if complex {
        TurnBudget { max_tokens: 2048, max_turns: 8 }
    } else {
        TurnBudget { max_tokens: 512, max_turns: 3 }
    }
}

pub struct OrchestratorResult {
    pub message: String,
    pub actions: Vec<ToolAction>,
    pub cached: bool,
}

/// Run one command to completion, invoking `emit` for every `StreamEvent`
/// along the way (the HTTP layer either drains these into an SSE stream
/// or discards all but the final `done`/`error` for the synchronous
/// endpoint).
pub async fn run(
    room: &RoomHandle,
    cache: &CommandCache,
    model: Option<&dyn ModelClient>,
    message: &str,
    max_objects_per_room: usize,
    cancel: &CancelToken,
    metrics: &Metrics,
    mut emit: impl FnMut(StreamEvent),
) -> OrchestratorResult {
    let intent_key = classify(message);
    let params = extract_params(message);

    if let Some(recipe) = cache.lookup(&intent_key) {
        metrics.record_cache_hit();
        let (templated_actions, response) = cache.replay(&recipe, &params);
        let actions = dispatch_all(room, templated_actions, max_objects_per_room, &mut emit);
        emit(StreamEvent::Done {
            message: response.clone(),
            actions: actions.clone(),
            cached: true,
        });
        return OrchestratorResult {
            message: response,
            actions,
            cached: true,
        };
    }
    metrics.record_cache_miss();

    let Some(model) = model else {
        metrics.record_fallback();
        return run_fallback(room, message, max_objects_per_room, &mut emit);
    };

    if cancel.is_cancelled() {
        emit(StreamEvent::Error { message: "aborted".to_string() });
        return OrchestratorResult { message: String::new(), actions: Vec::new(), cached: false };
    }

    let budget = turn_budget_for(message);
    let mut actions = Vec::new();
    let mut final_message = String::new();
    let mut ended_naturally = false;

    for turn in 1..=budget.max_turns {
        if cancel.is_cancelled() {
            emit(StreamEvent::Error { message: "aborted".to_string() });
            return OrchestratorResult { message: String::new(), actions, cached: false };
        }

        let board_context = serde_json::to_value(ib_tools::build_board_context(&room.doc))
            .unwrap_or(serde_json::Value::Null);
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_message: message.to_string(),
            board_context,
            max_tokens: budget.max_tokens,
        };

        match model.complete(request).await {
            Ok(response) => {
                let has_more_calls = !response.tool_calls.is_empty();
                for call in response.tool_calls {
                    if cancel.is_cancelled() {
                        emit(StreamEvent::Error { message: "aborted".to_string() });
                        return OrchestratorResult { message: String::new(), actions, cached: false };
                    }
                    if let Some(action) = dispatch_one(room, &call.tool_name, call.input, max_objects_per_room, &mut emit) {
                        actions.push(action);
                    }
                }
                final_message = response.text;
                if !has_more_calls {
                    ended_naturally = true;
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "model call failed");
                if turn == 1 && actions.is_empty() {
                    metrics.record_fallback();
                    return run_fallback(room, message, max_objects_per_room, &mut emit);
                }
                ended_naturally = true;
                break;
            }
        }
    }

    // Exhausting the turn budget without the model signaling it was done
    // still ends the turn, just with a generic message instead of
    // whatever partial text came back on the last (unfinished) call.
    let response_text = if ended_naturally { final_message } else { "Done.".to_string() };

    cache.learn(&intent_key, &actions, response_text.clone(), &params);
    emit(StreamEvent::Done {
        message: response_text.clone(),
        actions: actions.clone(),
        cached: false,
    });
    OrchestratorResult { message: response_text, actions, cached: false }
}

fn run_fallback(
    room: &RoomHandle,
    message: &str,
    max_objects_per_room: usize,
    emit: &mut impl FnMut(StreamEvent),
) -> OrchestratorResult {
    let outcome = ib_fallback::handle(&room.doc, message, max_objects_per_room);
    if !outcome.deltas.is_empty() {
        room.mark_dirty();
    }
    for delta in outcome.deltas {
        broadcast_delta(room, delta);
    }
    for action in &outcome.actions {
        emit(StreamEvent::ToolResult { action: action.clone() });
    }
    emit(StreamEvent::Done {
        message: outcome.response.clone(),
        actions: outcome.actions.clone(),
        cached: false,
    });
    OrchestratorResult { message: outcome.response, actions: outcome.actions, cached: false }
}

fn dispatch_all(
    room: &RoomHandle,
    templated_actions: Vec<(String, ToolInput)>,
    max_objects_per_room: usize,
    emit: &mut impl FnMut(StreamEvent),
) -> Vec<ToolAction> {
    templated_actions
        .into_iter()
        .filter_map(|(tool_name, input)| dispatch_one(room, &tool_name, input, max_objects_per_room, emit))
        .collect()
}

fn dispatch_one(
    room: &RoomHandle,
    tool_name: &str,
    input: ToolInput,
    max_objects_per_room: usize,
    emit: &mut impl FnMut(StreamEvent),
) -> Option<ToolAction> {
    let tool = ToolName::parse(tool_name)?;
    let outcome = ib_tools::execute(&room.doc, tool, &input, max_objects_per_room);
    if let Some(delta) = outcome.delta.clone() {
        room.mark_dirty();
        broadcast_delta(room, delta);
    }
    emit(StreamEvent::ToolResult { action: outcome.action.clone() });
    Some(outcome.action)
}

fn broadcast_delta(room: &RoomHandle, delta: Vec<u8>) {
    let mut frame = Vec::with_capacity(delta.len() + 1);
    frame.push(0u8);
    frame.extend_from_slice(&delta);
    room.broadcast(frame, None);
}
