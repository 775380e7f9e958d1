//! Intent classification and slot extraction for the command cache.
//!
//! This is a coarse, keyword-driven classifier — not the model. Its only
//! job is to decide "have we seen a message shaped like this before" and
//! to pull out the handful of values (a color, some text, a grid size)
//! that make two differently-worded requests produce the same recipe.

use regex::Regex;
use std::sync::OnceLock;

pub const GENERIC: &str = "generic";

const CATEGORIES: &[(&str, &[&str])] = &[
    ("create_sticky", &["sticky", "post-it", "post it"]),
    ("create_rect", &["rectangle", "rect ", "box"]),
    ("create_circle", &["circle", "ellipse"]),
    ("create_text", &["text box", "label"]),
    ("create_frame", &["frame", "section"]),
    ("update_color", &["color", "colour", "recolor"]),
    ("move_object", &["move ", "reposition", "drag"]),
    ("arrange", &["arrange", "grid"]),
    ("template_retro", &["retro", "retrospective"]),
    ("template_swot", &["swot"]),
    ("template_journey", &["journey", "user flow"]),
    ("template_kanban", &["kanban"]),
];

/// Classify a message into one of the fixed intent categories, or
/// `GENERIC` when nothing matches closely enough to be worth caching.
///
/// A grid request with an explicit `NxM` size gets its own dynamic key,
/// `create_grid_{C}x{R}`, so a learned 2x3 recipe never replays as a 4x4.
pub fn classify(message: &str) -> String {
    let lower = message.to_lowercase();

    if lower.contains("grid") {
        if let Some(c) = grid_re().captures(message) {
            return format!("create_grid_{}x{}", &c[1], &c[2]);
        }
    }

    for (key, keywords) in CATEGORIES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return (*key).to_string();
        }
    }
    GENERIC.to_string()
}

/// Slots pulled out of a message that a learned recipe's templates can be
/// hydrated with on replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pub color_hex: Option<String>,
    pub text: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub grid_cols: Option<u32>,
    pub grid_rows: Option<u32>,
    pub topic: Option<String>,
}

const COLOR_MAP: &[(&str, &str)] = &[
    ("yellow", "#FFD700"),
    ("gold", "#FFD700"),
    ("green", "#98FB98"),
    ("blue", "#87CEEB"),
    ("pink", "#FFB6C1"),
    ("purple", "#DDA0DD"),
    ("orange", "#FFA07A"),
    ("red", "#FF6B6B"),
    ("white", "#FFFFFF"),
    ("gray", "#D1D5DB"),
    ("grey", "#D1D5DB"),
];

fn quoted_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["'“]([^"'”]{1,200})["'”]"#).unwrap())
}

fn grid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*x\s*(\d+)").unwrap())
}

fn coordinate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bx\s*[:=]?\s*(-?\d+(?:\.\d+)?)\D+y\s*[:=]?\s*(-?\d+(?:\.\d+)?)").unwrap())
}

fn hex_color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#[0-9a-fA-F]{6}").unwrap())
}

fn topic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\babout\s+(.{1,80})$").unwrap())
}

pub fn extract_params(message: &str) -> Params {
    let lower = message.to_lowercase();

    let color_hex = COLOR_MAP
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, hex)| hex.to_string())
        .or_else(|| hex_color_re().find(message).map(|m| m.as_str().to_uppercase()));

    let text = quoted_text_re()
        .captures(message)
        .map(|c| c[1].to_string());

    let (x, y) = coordinate_re()
        .captures(message)
        .map(|c| (c[1].parse().ok(), c[2].parse().ok()))
        .unwrap_or((None, None));

    let (grid_cols, grid_rows) = grid_re()
        .captures(message)
        .map(|c| (c[1].parse().ok(), c[2].parse().ok()))
        .unwrap_or((None, None));

    let topic = topic_re()
        .captures(message)
        .map(|c| c[1].trim().trim_end_matches('.').to_string());

    Params {
        color_hex,
        text,
        x,
        y,
        grid_cols,
        grid_rows,
        topic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_shapes() {
        assert_eq!(classify("add a yellow sticky note"), "create_sticky");
        assert_eq!(classify("make a retro board"), "template_retro");
        assert_eq!(classify("run a SWOT analysis"), "template_swot");
        assert_eq!(classify("set up a kanban board"), "template_kanban");
        assert_eq!(classify("what's the weather"), GENERIC);
    }

    #[test]
    fn classifies_grid_requests_with_their_dimensions() {
        assert_eq!(classify("arrange these in a 3x4 grid"), "create_grid_3x4");
        assert_eq!(classify("lay out a 2x2 grid of stickies"), "create_grid_2x2");
    }

    #[test]
    fn extracts_color_and_quoted_text() {
        let params = extract_params("change it to blue and say \"hello team\"");
        assert_eq!(params.color_hex.as_deref(), Some("#87CEEB"));
        assert_eq!(params.text.as_deref(), Some("hello team"));
    }

    #[test]
    fn extracts_gold_as_distinct_from_yellow() {
        let params = extract_params("make it gold");
        assert_eq!(params.color_hex.as_deref(), Some("#FFD700"));
    }

    #[test]
    fn extracts_literal_hex_color_as_fallback() {
        let params = extract_params("set the fill to #123ABC");
        assert_eq!(params.color_hex.as_deref(), Some("#123ABC"));
    }

    #[test]
    fn extracts_grid_dimensions() {
        let params = extract_params("arrange these in a 3x4 grid");
        assert_eq!(params.grid_cols, Some(3));
        assert_eq!(params.grid_rows, Some(4));
    }

    #[test]
    fn extracts_topic_after_about() {
        let params = extract_params("start a retro about the Q3 launch");
        assert_eq!(params.topic.as_deref(), Some("the Q3 launch"));
    }
}
