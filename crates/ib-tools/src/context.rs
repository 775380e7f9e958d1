//! `buildBoardContext` — the compact board summary handed to the model so
//! it can ground its next tool call without seeing the entire document.

use ib_crdt::BoardDocument;
use ib_domain::{BoardObject, Rect};
use serde::Serialize;

use crate::placement::{bounding_box, centroid, find_free_position};

const MAX_CONTEXT_OBJECTS: usize = 30;
const DEFAULT_HINT_SIZE: (f64, f64) = (200.0, 150.0);

#[derive(Debug, Clone, Serialize)]
pub struct BoardContext {
    pub objects: Vec<BoardObject>,
    pub occupied: Option<Rect>,
    pub placement_hint: (f64, f64),
    pub total_object_count: usize,
}

pub fn build_board_context(doc: &BoardDocument) -> BoardContext {
    let mut objects = doc.all_objects();
    let total_object_count = objects.len();

    if objects.is_empty() {
        return BoardContext {
            objects: Vec::new(),
            occupied: None,
            placement_hint: (20.0, 20.0),
            total_object_count: 0,
        };
    }

    let (cx, cy) = centroid(&objects);
    objects.sort_by(|a, b| distance_to(a, cx, cy)
        .partial_cmp(&distance_to(b, cx, cy))
        .unwrap_or(std::cmp::Ordering::Equal));
    objects.truncate(MAX_CONTEXT_OBJECTS);

    let occupied = bounding_box(&objects);
    let placement_hint = find_free_position(doc, DEFAULT_HINT_SIZE.0, DEFAULT_HINT_SIZE.1);

    BoardContext {
        objects,
        occupied,
        placement_hint,
        total_object_count,
    }
}

fn distance_to(object: &BoardObject, cx: f64, cy: f64) -> f64 {
    let r = object.rect();
    let ox = (r.x + r.right) / 2.0;
    let oy = (r.y + r.bottom) / 2.0;
    ((ox - cx).powi(2) + (oy - cy).powi(2)).sqrt()
}

/// Render a `BoardContext` as the human-readable snapshot `getBoardState`
/// returns and the orchestrator hands the model as board grounding. The
/// format is a stable contract: per-object lines carry `"(x, y)"` and
/// `Parent: "id"`, and the header carries `"N total"`.
pub fn render_board_state(context: &BoardContext) -> String {
    if context.objects.is_empty() {
        return "0 total objects. The board is empty.".to_string();
    }

    let mut out = format!("{} total objects (showing {}):\n", context.total_object_count, context.objects.len());
    for object in &context.objects {
        out.push_str(&render_object_line(object));
        out.push('\n');
    }

    match &context.occupied {
        Some(bounds) => {
            out.push_str(&format!("Occupied area: x:0..{:.0}, y:0..{:.0}\n", bounds.right, bounds.bottom));
            out.push_str(&format!(
                "Place new objects after x:{:.0} or y:{:.0}",
                bounds.right + 30.0,
                bounds.bottom + 30.0
            ));
        }
        None => {
            out.push_str(&format!("Place new objects near ({:.0}, {:.0})", context.placement_hint.0, context.placement_hint.1));
        }
    }
    out
}

fn render_object_line(object: &BoardObject) -> String {
    let mut line = format!(
        "- {} \"{}\" at ({:.0}, {:.0}) size {:.0}x{:.0} fill {}",
        object.kind.as_str(),
        object.id,
        object.x,
        object.y,
        object.width,
        object.height,
        object.fill,
    );
    if let Some(text) = &object.text {
        line.push_str(&format!(" text: \"{text}\""));
    }
    if let Some(parent_id) = &object.parent_id {
        line.push_str(&format!(" Parent: \"{parent_id}\""));
    }
    if let Some(from_id) = &object.from_id {
        line.push_str(&format!(" fromId: \"{from_id}\""));
    }
    if let Some(to_id) = &object.to_id {
        line.push_str(&format!(" toId: \"{to_id}\""));
    }
    if let Some(points) = &object.points {
        line.push_str(&format!(" points: [{:.0}, {:.0}, {:.0}, {:.0}]", points[0], points[1], points[2], points[3]));
    }
    line
}
