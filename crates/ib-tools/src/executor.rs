//! Tool Executor — component **C5**.
//!
//! Each function here performs one tool call against a room's CRDT
//! document and reports what happened as a `ToolAction`. Geometry
//! decisions (auto-placement, auto-parenting) are delegated to
//! `placement`; this module only owns field extraction, validation, and
//! dispatch.

use chrono::Utc;
use ib_crdt::BoardDocument;
use ib_domain::{BoardObject, ObjectType, Rect, ToolAction, ToolInput, ToolName};
use serde_json::Value;

use crate::context::{build_board_context, render_board_state};
use crate::placement::{find_containing_frame, find_free_position, resolve_collision};

/// The result of running one tool call: the action record for the
/// streamed response, and — when the call mutated the document — the
/// CRDT delta to forward to the room's other connections.
pub struct ExecutionOutcome {
    pub action: ToolAction,
    pub delta: Option<Vec<u8>>,
}

fn ok(tool_name: &str, input: &ToolInput, result: Value, delta: Option<Vec<u8>>) -> ExecutionOutcome {
    ExecutionOutcome {
        action: ToolAction {
            tool_name: tool_name.to_string(),
            input: input.clone(),
            result: result.to_string(),
        },
        delta,
    }
}

/// Like `ok`, but for tools (`getBoardState`) whose result is itself a
/// formatted string rather than a JSON value to serialize.
fn ok_text(tool_name: &str, input: &ToolInput, text: String) -> ExecutionOutcome {
    ExecutionOutcome {
        action: ToolAction {
            tool_name: tool_name.to_string(),
            input: input.clone(),
            result: text,
        },
        delta: None,
    }
}

fn err(tool_name: &str, input: &ToolInput, message: impl Into<String>) -> ExecutionOutcome {
    ExecutionOutcome {
        action: ToolAction {
            tool_name: tool_name.to_string(),
            input: input.clone(),
            result: format!("error: {}", message.into()),
        },
        delta: None,
    }
}

pub fn execute(
    doc: &BoardDocument,
    tool: ToolName,
    input: &ToolInput,
    max_objects_per_room: usize,
) -> ExecutionOutcome {
    match tool {
        ToolName::CreateObject => create_object(doc, input, max_objects_per_room),
        ToolName::UpdateObject => update_object(doc, input),
        ToolName::MoveObject => move_object(doc, input),
        ToolName::GetBoardState => get_board_state(doc, input),
    }
}

fn str_field<'a>(input: &'a ToolInput, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

fn f64_field(input: &ToolInput, key: &str) -> Option<f64> {
    input.get(key).and_then(Value::as_f64)
}

fn generate_id(prefix: &str) -> String {
    let ts = Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{ts}-{}", &suffix[..8])
}

fn create_object(doc: &BoardDocument, input: &ToolInput, max_objects_per_room: usize) -> ExecutionOutcome {
    const TOOL: &str = "createObject";

    if doc.object_count() >= max_objects_per_room {
        return err(TOOL, input, "board is at its object limit");
    }

    let Some(kind) = str_field(input, "type").and_then(ObjectType::parse) else {
        return err(TOOL, input, "missing or unrecognized 'type'");
    };

    let (default_width, default_height, default_fill) = kind.defaults();
    let width = f64_field(input, "width").unwrap_or(default_width);
    let height = f64_field(input, "height").unwrap_or(default_height);
    let fill = str_field(input, "fill").map(str::to_string).unwrap_or_else(|| default_fill.to_string());

    let skip_collision_check = input.get("skipCollisionCheck").and_then(Value::as_bool).unwrap_or(false);

    let (x, y) = match (f64_field(input, "x"), f64_field(input, "y")) {
        (Some(x), Some(y)) if skip_collision_check || kind == ObjectType::Line => (x, y),
        (Some(x), Some(y)) => resolve_collision(doc, x, y, width, height),
        _ => find_free_position(doc, width, height),
    };

    let rect = Rect::new(x, y, width, height);
    let parent_id = str_field(input, "parentId")
        .map(str::to_string)
        .or_else(|| {
            if kind == ObjectType::Frame {
                None
            } else {
                find_containing_frame(doc, &rect)
            }
        });

    let object = BoardObject {
        id: generate_id(kind.as_str()),
        kind,
        x,
        y,
        width,
        height,
        fill,
        rotation: f64_field(input, "rotation").unwrap_or(0.0),
        text: str_field(input, "text").map(str::to_string),
        font_size: f64_field(input, "fontSize"),
        parent_id,
        points: None,
        from_id: str_field(input, "fromId").map(str::to_string),
        to_id: str_field(input, "toId").map(str::to_string),
        arrow_end: input.get("arrowEnd").and_then(Value::as_bool).unwrap_or(true),
    };

    match doc.insert_object(object.clone()) {
        Ok(delta) => ok(TOOL, input, serde_json::to_value(&object).unwrap(), Some(delta)),
        Err(e) => err(TOOL, input, e.to_string()),
    }
}

fn update_object(doc: &BoardDocument, input: &ToolInput) -> ExecutionOutcome {
    const TOOL: &str = "updateObject";

    let Some(id) = str_field(input, "id") else {
        return err(TOOL, input, "missing 'id'");
    };

    let fill = str_field(input, "fill").map(str::to_string);
    let text = str_field(input, "text").map(str::to_string);
    let width = f64_field(input, "width");
    let height = f64_field(input, "height");
    let rotation = f64_field(input, "rotation");
    let font_size = f64_field(input, "fontSize");

    let result = doc.patch_object(id, |object| {
        if let Some(fill) = fill {
            object.fill = fill;
        }
        if let Some(text) = text {
            object.text = Some(text);
        }
        if let Some(width) = width {
            object.width = width;
        }
        if let Some(height) = height {
            object.height = height;
        }
        if let Some(rotation) = rotation {
            object.rotation = rotation;
        }
        if let Some(font_size) = font_size {
            object.font_size = Some(font_size);
        }
    });

    match result {
        Ok(Some(delta)) => match doc.get_object(id) {
            Some(object) => ok(TOOL, input, serde_json::to_value(&object).unwrap(), Some(delta)),
            None => err(TOOL, input, "object vanished during update"),
        },
        Ok(None) => err(TOOL, input, format!("no object with id '{id}'")),
        Err(e) => err(TOOL, input, e.to_string()),
    }
}

fn move_object(doc: &BoardDocument, input: &ToolInput) -> ExecutionOutcome {
    const TOOL: &str = "moveObject";

    let Some(id) = str_field(input, "id") else {
        return err(TOOL, input, "missing 'id'");
    };
    let Some(x) = f64_field(input, "x") else {
        return err(TOOL, input, "missing 'x'");
    };
    let Some(y) = f64_field(input, "y") else {
        return err(TOOL, input, "missing 'y'");
    };

    let Some(current) = doc.get_object(id) else {
        return err(TOOL, input, format!("no object with id '{id}'"));
    };
    let moved_rect = Rect::new(x, y, current.width, current.height);
    let new_parent = if current.kind == ObjectType::Frame {
        current.parent_id.clone()
    } else {
        find_containing_frame(doc, &moved_rect)
    };

    let result = doc.patch_object(id, |object| {
        object.x = x;
        object.y = y;
        object.parent_id = new_parent;
    });

    match result {
        Ok(Some(delta)) => match doc.get_object(id) {
            Some(object) => ok(TOOL, input, serde_json::to_value(&object).unwrap(), Some(delta)),
            None => err(TOOL, input, "object vanished during move"),
        },
        Ok(None) => err(TOOL, input, format!("no object with id '{id}'")),
        Err(e) => err(TOOL, input, e.to_string()),
    }
}

fn get_board_state(doc: &BoardDocument, input: &ToolInput) -> ExecutionOutcome {
    const TOOL: &str = "getBoardState";
    let context = build_board_context(doc);
    ok_text(TOOL, input, render_board_state(&context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn input(pairs: &[(&str, Value)]) -> ToolInput {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<HashMap<_, _>>()
    }

    #[test]
    fn create_object_auto_places_and_applies_defaults() {
        let doc = BoardDocument::new();
        let outcome = create_object(&doc, &input(&[("type", Value::from("sticky"))]), 100);
        assert!(!outcome.action.result.starts_with("error"));
        assert_eq!(doc.object_count(), 1);
        let created = doc.all_objects().remove(0);
        assert_eq!(created.fill, "#FFD700");
        assert_eq!(created.width, 200.0);
    }

    #[test]
    fn create_object_rejects_unknown_type() {
        let doc = BoardDocument::new();
        let outcome = create_object(&doc, &input(&[("type", Value::from("bogus"))]), 100);
        assert!(outcome.action.result.starts_with("error"));
        assert_eq!(doc.object_count(), 0);
    }

    #[test]
    fn create_object_respects_object_cap() {
        let doc = BoardDocument::new();
        let outcome = create_object(&doc, &input(&[("type", Value::from("sticky"))]), 0);
        assert!(outcome.action.result.starts_with("error"));
    }

    #[test]
    fn create_object_auto_parents_into_containing_frame() {
        let doc = BoardDocument::new();
        create_object(
            &doc,
            &input(&[
                ("type", Value::from("frame")),
                ("x", Value::from(0.0)),
                ("y", Value::from(0.0)),
                ("width", Value::from(500.0)),
                ("height", Value::from(500.0)),
            ]),
            100,
        );
        let frame_id = doc.all_objects().into_iter().find(|o| o.kind == ObjectType::Frame).unwrap().id;

        create_object(
            &doc,
            &input(&[
                ("type", Value::from("sticky")),
                ("x", Value::from(50.0)),
                ("y", Value::from(50.0)),
            ]),
            100,
        );
        let sticky = doc.all_objects().into_iter().find(|o| o.kind == ObjectType::Sticky).unwrap();
        assert_eq!(sticky.parent_id, Some(frame_id));
    }

    #[test]
    fn move_object_updates_position() {
        let doc = BoardDocument::new();
        create_object(&doc, &input(&[("type", Value::from("sticky")), ("x", Value::from(0.0)), ("y", Value::from(0.0))]), 100);
        let id = doc.all_objects().remove(0).id;

        let outcome = move_object(&doc, &input(&[("id", Value::from(id.clone())), ("x", Value::from(300.0)), ("y", Value::from(400.0))]));
        assert!(!outcome.action.result.starts_with("error"));
        let moved = doc.get_object(&id).unwrap();
        assert_eq!((moved.x, moved.y), (300.0, 400.0));
    }

    #[test]
    fn move_object_missing_id_fails() {
        let doc = BoardDocument::new();
        let outcome = move_object(&doc, &input(&[("x", Value::from(1.0)), ("y", Value::from(1.0))]));
        assert!(outcome.action.result.starts_with("error"));
    }

    #[test]
    fn create_object_avoids_collision_with_requested_position() {
        let doc = BoardDocument::new();
        doc.insert_object(BoardObject {
            id: "existing".to_string(),
            kind: ObjectType::Sticky,
            x: 100.0,
            y: 100.0,
            width: 200.0,
            height: 150.0,
            fill: "#FFD700".to_string(),
            rotation: 0.0,
            text: None,
            font_size: None,
            parent_id: None,
            points: None,
            from_id: None,
            to_id: None,
            arrow_end: true,
        })
        .unwrap();

        let outcome = create_object(
            &doc,
            &input(&[("type", Value::from("sticky")), ("x", Value::from(100.0)), ("y", Value::from(100.0))]),
            100,
        );
        assert!(!outcome.action.result.starts_with("error"));
        let created = doc.all_objects().into_iter().find(|o| o.id != "existing").unwrap();
        assert_ne!((created.x, created.y), (100.0, 100.0));
        let new_rect = created.rect();
        let existing_rect = Rect::new(100.0, 100.0, 200.0, 150.0);
        assert!(!new_rect.overlaps(&existing_rect));
    }

    #[test]
    fn create_object_skip_collision_check_uses_requested_position_verbatim() {
        let doc = BoardDocument::new();
        create_object(
            &doc,
            &input(&[
                ("type", Value::from("frame")),
                ("x", Value::from(50.0)),
                ("y", Value::from(50.0)),
                ("width", Value::from(400.0)),
                ("height", Value::from(300.0)),
            ]),
            100,
        );
        let frame_id = doc.all_objects().into_iter().find(|o| o.kind == ObjectType::Frame).unwrap().id;

        create_object(
            &doc,
            &input(&[
                ("type", Value::from("sticky")),
                ("x", Value::from(70.0)),
                ("y", Value::from(100.0)),
                ("skipCollisionCheck", Value::from(true)),
            ]),
            100,
        );
        let sticky = doc.all_objects().into_iter().find(|o| o.kind == ObjectType::Sticky).unwrap();
        assert_eq!((sticky.x, sticky.y), (70.0, 100.0));
        assert_eq!(sticky.parent_id, Some(frame_id));
    }

    #[test]
    fn get_board_state_never_mutates() {
        let doc = BoardDocument::new();
        let outcome = get_board_state(&doc, &input(&[]));
        assert!(outcome.delta.is_none());
    }

    #[test]
    fn get_board_state_renders_a_formatted_string() {
        let doc = BoardDocument::new();
        create_object(&doc, &input(&[("type", Value::from("sticky")), ("x", Value::from(20.0)), ("y", Value::from(20.0))]), 100);

        let outcome = get_board_state(&doc, &input(&[]));
        assert!(outcome.action.result.contains("1 total"));
        assert!(outcome.action.result.contains("(20, 20)"));
    }
}
