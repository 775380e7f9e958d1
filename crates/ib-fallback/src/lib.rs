//! Local Fallback Parser — component **C7**.
//!
//! Runs when no external model is configured, or the model call failed.
//! An ordered list of keyword matchers covers the commands a whiteboard
//! session actually needs; whatever doesn't match becomes a help message
//! rather than a dropped request.

use ib_cache::{extract_params, Params};
use ib_crdt::BoardDocument;
use ib_domain::{ObjectType, ToolAction, ToolInput, ToolName};
use serde_json::Value;

pub struct FallbackOutcome {
    pub actions: Vec<ToolAction>,
    pub deltas: Vec<Vec<u8>>,
    pub response: String,
}

impl FallbackOutcome {
    fn empty(response: impl Into<String>) -> Self {
        Self {
            actions: Vec::new(),
            deltas: Vec::new(),
            response: response.into(),
        }
    }
}

const HELP_TEXT: &str = "I can create sticky notes, shapes, and frames, move or recolor things, \
lay out a grid, or scaffold a retro / SWOT / user-journey board. Try something like \
\"add a yellow sticky note\" or \"start a retro\".";

/// Run the whole fallback pipeline against `message`, mutating `doc` as a
/// side effect of whichever matcher fires.
///
/// Matchers are tried most-specific first — user-journey-map, SWOT,
/// retrospective, create-grid, resize-frame-to-fit, space-evenly,
/// move-by-color-direction, arrange-in-grid, update-color,
/// create-named-frame, create-object — independent of the Command
/// Cache's intent catalog, which is a different, coarser classification.
pub fn handle(doc: &BoardDocument, message: &str, max_objects_per_room: usize) -> FallbackOutcome {
    let lower = message.to_lowercase();
    let params = extract_params(message);

    let matched = if lower.contains("journey") || lower.contains("user flow") {
        Some(journey(doc, max_objects_per_room))
    } else if lower.contains("swot") {
        Some(swot(doc, max_objects_per_room))
    } else if lower.contains("retro") {
        Some(retro(doc, max_objects_per_room))
    } else if is_generator_phrasing(message) {
        Some(grid_generator(doc, &params, max_objects_per_room))
    } else if lower.contains("resize") || lower.contains("make it bigger") || lower.contains("make it smaller") {
        resize_frame(doc, &params)
    } else if lower.contains("space evenly") || lower.contains("distribute") || lower.contains("spread out") {
        Some(space_evenly(doc))
    } else if params.color_hex.is_some() && direction_of(message).is_some() {
        Some(move_by_color_direction(doc, &params, direction_of(message).unwrap()))
    } else if lower.contains("grid") || lower.contains("arrange") {
        Some(arrange_in_grid(doc))
    } else if lower.contains("color") || lower.contains("colour") || lower.contains("recolor") {
        update_color(doc, &params)
    } else if lower.contains("frame") && mentions_name(message) {
        Some(create_named_frame(doc, message, max_objects_per_room))
    } else if let Some(kind) = object_keyword(&lower) {
        Some(create_object(doc, kind, max_objects_per_room))
    } else {
        None
    };

    matched.unwrap_or_else(|| FallbackOutcome::empty(HELP_TEXT))
}

fn object_keyword(lower: &str) -> Option<ObjectType> {
    if lower.contains("sticky") || lower.contains("post-it") || lower.contains("post it") {
        Some(ObjectType::Sticky)
    } else if lower.contains("rectangle") || lower.contains("rect ") || lower.contains("box") {
        Some(ObjectType::Rect)
    } else if lower.contains("circle") || lower.contains("ellipse") {
        Some(ObjectType::Circle)
    } else if lower.contains("text box") || lower.contains("label") {
        Some(ObjectType::Text)
    } else if lower.contains("frame") || lower.contains("section") {
        Some(ObjectType::Frame)
    } else {
        None
    }
}

fn is_generator_phrasing(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("grid") && (lower.contains("create") || lower.contains("make") || lower.contains("generate") || lower.contains("new"))
}

fn mentions_name(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("called") || lower.contains("named") || message.contains('"') || message.contains('\'')
}

fn direction_of(message: &str) -> Option<(f64, f64)> {
    let lower = message.to_lowercase();
    if lower.contains("left") {
        Some((-100.0, 0.0))
    } else if lower.contains("right") {
        Some((100.0, 0.0))
    } else if lower.contains("up") {
        Some((0.0, -100.0))
    } else if lower.contains("down") {
        Some((0.0, 100.0))
    } else {
        None
    }
}

fn invoke(doc: &BoardDocument, tool: ToolName, input: ToolInput, max_objects: usize) -> (ToolAction, Option<Vec<u8>>) {
    let outcome = ib_tools::execute(doc, tool, &input, max_objects);
    (outcome.action, outcome.delta)
}

fn input_of(pairs: Vec<(&str, Value)>) -> ToolInput {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn collect(calls: Vec<(ToolAction, Option<Vec<u8>>)>, response: String) -> FallbackOutcome {
    let mut actions = Vec::with_capacity(calls.len());
    let mut deltas = Vec::new();
    for (action, delta) in calls {
        actions.push(action);
        if let Some(d) = delta {
            deltas.push(d);
        }
    }
    FallbackOutcome {
        actions,
        deltas,
        response,
    }
}

// ── Layout generators ──────────────────────────────────────────────────

fn create_frame_stage(doc: &BoardDocument, name: &str, x: f64, y: f64, w: f64, h: f64, max_objects: usize) -> (ToolAction, Option<Vec<u8>>) {
    invoke(
        doc,
        ToolName::CreateObject,
        input_of(vec![
            ("type", Value::from(ObjectType::Frame.as_str())),
            ("x", Value::from(x)),
            ("y", Value::from(y)),
            ("width", Value::from(w)),
            ("height", Value::from(h)),
            ("text", Value::from(name)),
        ]),
        max_objects,
    )
}

fn journey(doc: &BoardDocument, max_objects: usize) -> FallbackOutcome {
    const STAGES: [&str; 5] = ["Discover", "Consider", "Purchase", "Onboard", "Retain"];
    const W: f64 = 220.0;
    const H: f64 = 300.0;
    const GAP: f64 = 20.0;

    let calls = STAGES
        .iter()
        .enumerate()
        .map(|(i, stage)| create_frame_stage(doc, stage, GAP + i as f64 * (W + GAP), GAP, W, H, max_objects))
        .collect();

    collect(calls, "Laid out a 5-stage user journey: Discover, Consider, Purchase, Onboard, Retain.".to_string())
}

fn swot(doc: &BoardDocument, max_objects: usize) -> FallbackOutcome {
    const W: f64 = 300.0;
    const H: f64 = 300.0;
    const GAP: f64 = 20.0;
    const QUADRANTS: [(&str, f64, f64); 4] = [
        ("Strengths", 0.0, 0.0),
        ("Weaknesses", 1.0, 0.0),
        ("Opportunities", 0.0, 1.0),
        ("Threats", 1.0, 1.0),
    ];

    let calls = QUADRANTS
        .iter()
        .map(|(name, col, row)| {
            create_frame_stage(doc, name, GAP + col * (W + GAP), GAP + row * (H + GAP), W, H, max_objects)
        })
        .collect();

    collect(calls, "Set up a SWOT board with Strengths, Weaknesses, Opportunities, and Threats.".to_string())
}

fn retro(doc: &BoardDocument, max_objects: usize) -> FallbackOutcome {
    const STAGES: [&str; 3] = ["Went Well", "To Improve", "Action Items"];
    const W: f64 = 300.0;
    const H: f64 = 400.0;
    const GAP: f64 = 20.0;

    let calls = STAGES
        .iter()
        .enumerate()
        .map(|(i, stage)| create_frame_stage(doc, stage, GAP + i as f64 * (W + GAP), GAP, W, H, max_objects))
        .collect();

    collect(calls, "Set up a retro board with Went Well, To Improve, and Action Items.".to_string())
}

fn grid_generator(doc: &BoardDocument, params: &Params, max_objects: usize) -> FallbackOutcome {
    const CELL_W: f64 = 200.0;
    const CELL_H: f64 = 150.0;
    const GAP: f64 = 20.0;

    let cols = params.grid_cols.unwrap_or(3).max(1);
    let rows = params.grid_rows.unwrap_or(3).max(1);

    let mut calls = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let x = GAP + col as f64 * (CELL_W + GAP);
            let y = GAP + row as f64 * (CELL_H + GAP);
            calls.push(invoke(
                doc,
                ToolName::CreateObject,
                input_of(vec![
                    ("type", Value::from(ObjectType::Sticky.as_str())),
                    ("x", Value::from(x)),
                    ("y", Value::from(y)),
                ]),
                max_objects,
            ));
        }
    }

    collect(calls, format!("Created a {cols}x{rows} grid of sticky notes."))
}

// ── Existing-object operations ─────────────────────────────────────────

fn resize_frame(doc: &BoardDocument, params: &Params) -> Option<FallbackOutcome> {
    let frame = doc.all_objects().into_iter().find(|o| o.kind == ObjectType::Frame)?;
    let width = params.grid_cols.map(|c| c as f64 * 100.0);
    let height = params.grid_rows.map(|r| r as f64 * 100.0);
    let (width, height) = (width?, height?);

    let mut input = ToolInput::new();
    input.insert("id".to_string(), Value::from(frame.id.clone()));
    input.insert("width".to_string(), Value::from(width));
    input.insert("height".to_string(), Value::from(height));

    let call = invoke(doc, ToolName::UpdateObject, input, usize::MAX);
    Some(collect(vec![call], format!("Resized the frame to {width}x{height}.")))
}

fn space_evenly(doc: &BoardDocument) -> FallbackOutcome {
    let mut objects: Vec<_> = doc.all_objects().into_iter().filter(|o| o.kind != ObjectType::Frame).collect();
    objects.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    const GAP: f64 = 40.0;
    let mut cursor = objects.first().map(|o| o.x).unwrap_or(20.0);
    let mut calls = Vec::new();
    for object in &objects {
        let mut input = ToolInput::new();
        input.insert("id".to_string(), Value::from(object.id.clone()));
        input.insert("x".to_string(), Value::from(cursor));
        input.insert("y".to_string(), Value::from(object.y));
        calls.push(invoke(doc, ToolName::MoveObject, input, usize::MAX));
        cursor += object.width + GAP;
    }

    collect(calls, format!("Spaced {} objects evenly.", objects.len()))
}

fn move_by_color_direction(doc: &BoardDocument, params: &Params, (dx, dy): (f64, f64)) -> FallbackOutcome {
    let color = params.color_hex.clone().unwrap_or_default();
    let targets: Vec<_> = doc.all_objects().into_iter().filter(|o| o.fill == color).collect();

    let calls = targets
        .iter()
        .map(|o| {
            let mut input = ToolInput::new();
            input.insert("id".to_string(), Value::from(o.id.clone()));
            input.insert("x".to_string(), Value::from(o.x + dx));
            input.insert("y".to_string(), Value::from(o.y + dy));
            invoke(doc, ToolName::MoveObject, input, usize::MAX)
        })
        .collect();

    collect(calls, format!("Moved {} matching objects.", targets.len()))
}

fn arrange_in_grid(doc: &BoardDocument) -> FallbackOutcome {
    let objects: Vec<_> = doc.all_objects().into_iter().filter(|o| o.kind != ObjectType::Frame).collect();
    if objects.is_empty() {
        return FallbackOutcome::empty("There's nothing on the board to arrange yet.".to_string());
    }

    let cols = (objects.len() as f64).sqrt().ceil() as usize;
    let cell_w = objects.iter().map(|o| o.width).fold(0.0_f64, f64::max) + 20.0;
    let cell_h = objects.iter().map(|o| o.height).fold(0.0_f64, f64::max) + 20.0;

    let calls = objects
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let col = i % cols;
            let row = i / cols;
            let mut input = ToolInput::new();
            input.insert("id".to_string(), Value::from(o.id.clone()));
            input.insert("x".to_string(), Value::from(20.0 + col as f64 * cell_w));
            input.insert("y".to_string(), Value::from(20.0 + row as f64 * cell_h));
            invoke(doc, ToolName::MoveObject, input, usize::MAX)
        })
        .collect();

    collect(calls, format!("Arranged {} objects into a grid.", objects.len()))
}

fn update_color(doc: &BoardDocument, params: &Params) -> Option<FallbackOutcome> {
    let color = params.color_hex.clone()?;
    let targets = doc.all_objects();

    let calls = targets
        .iter()
        .map(|o| {
            let mut input = ToolInput::new();
            input.insert("id".to_string(), Value::from(o.id.clone()));
            input.insert("fill".to_string(), Value::from(color.clone()));
            invoke(doc, ToolName::UpdateObject, input, usize::MAX)
        })
        .collect();

    Some(collect(calls, format!("Recolored {} objects to {color}.", targets.len())))
}

fn create_named_frame(doc: &BoardDocument, message: &str, max_objects: usize) -> FallbackOutcome {
    let params = extract_params(message);
    let name = params.text.unwrap_or_else(|| "Untitled".to_string());

    let call = invoke(
        doc,
        ToolName::CreateObject,
        input_of(vec![("type", Value::from(ObjectType::Frame.as_str())), ("text", Value::from(name.clone()))]),
        max_objects,
    );

    collect(vec![call], format!("Created a frame called \"{name}\"."))
}

fn create_object(doc: &BoardDocument, kind: ObjectType, max_objects: usize) -> FallbackOutcome {
    let call = invoke(doc, ToolName::CreateObject, input_of(vec![("type", Value::from(kind.as_str()))]), max_objects);
    collect(vec![call], format!("Added a new {}.", kind.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_message_returns_help() {
        let doc = BoardDocument::new();
        let outcome = handle(&doc, "what's the capital of France", 100);
        assert!(outcome.actions.is_empty());
        assert_eq!(outcome.response, HELP_TEXT);
    }

    #[test]
    fn retro_request_creates_three_frames() {
        let doc = BoardDocument::new();
        let outcome = handle(&doc, "let's run a retro", 100);
        assert_eq!(outcome.actions.len(), 3);
        assert_eq!(doc.object_count(), 3);
    }

    #[test]
    fn sticky_request_creates_one_object() {
        let doc = BoardDocument::new();
        let outcome = handle(&doc, "add a sticky note", 100);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(doc.object_count(), 1);
    }

    #[test]
    fn grid_generator_honors_requested_dimensions() {
        let doc = BoardDocument::new();
        let outcome = handle(&doc, "create a 2x3 grid of stickies", 100);
        assert_eq!(outcome.actions.len(), 6);
    }

    #[test]
    fn update_color_recolors_existing_objects() {
        let doc = BoardDocument::new();
        handle(&doc, "add a sticky note", 100);
        let outcome = handle(&doc, "change the color to blue", 100);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(doc.all_objects()[0].fill, "#87CEEB");
    }
}
