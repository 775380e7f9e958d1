//! Board object data model — the fields a `BoardObject` carries, independent
//! of how it is stored in the CRDT (see `ib-crdt`).

use serde::{Deserialize, Serialize};

/// Object kind. Only frames may be `parentId` targets; only `line` carries
/// `points`/`fromId`/`toId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Sticky,
    Rect,
    Circle,
    Text,
    Frame,
    Line,
}

impl ObjectType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sticky" => Some(Self::Sticky),
            "rect" => Some(Self::Rect),
            "circle" => Some(Self::Circle),
            "text" => Some(Self::Text),
            "frame" => Some(Self::Frame),
            "line" => Some(Self::Line),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sticky => "sticky",
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Text => "text",
            Self::Frame => "frame",
            Self::Line => "line",
        }
    }

    /// `(width, height, fill)` defaults per §4.4.
    pub fn defaults(self) -> (f64, f64, &'static str) {
        match self {
            Self::Sticky => (200.0, 150.0, "#FFD700"),
            Self::Rect => (150.0, 100.0, "#87CEEB"),
            Self::Circle => (100.0, 100.0, "#DDA0DD"),
            Self::Text => (200.0, 50.0, "#333333"),
            Self::Frame => (400.0, 300.0, "#E8E8E8"),
            Self::Line => (2.0, 2.0, "#333333"),
        }
    }
}

/// A single object on the board. Mirrors the CRDT record shape exactly;
/// `ib-crdt` is responsible for translating to/from the `yrs::MapRef` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "fontSize")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "parentId")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "fromId")]
    pub from_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "toId")]
    pub to_id: Option<String>,
    #[serde(default = "d_arrow_end", rename = "arrowEnd", skip_serializing_if = "is_default_arrow_end")]
    pub arrow_end: bool,
}

fn d_arrow_end() -> bool {
    true
}

fn is_default_arrow_end(v: &bool) -> bool {
    *v
}

impl BoardObject {
    /// Axis-aligned bounding rect `(x, y, x+w, y+h)`.
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            right: self.x + self.width,
            bottom: self.y + self.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            right: x + width,
            bottom: y + height,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.x
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.y
    }

    /// Whether `self` overlaps `other` (strict rectangle intersection).
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right && self.right > other.x && self.y < other.bottom && self.bottom > other.y
    }

    /// Whether `self` strictly contains `other`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x && other.y >= self.y && other.right <= self.right && other.bottom <= self.bottom
    }

    pub fn padded(&self, padding: f64) -> Rect {
        Rect {
            x: self.x - padding,
            y: self.y - padding,
            right: self.right + padding,
            bottom: self.bottom + padding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_round_trips_through_parse() {
        for t in [
            ObjectType::Sticky,
            ObjectType::Rect,
            ObjectType::Circle,
            ObjectType::Text,
            ObjectType::Frame,
            ObjectType::Line,
        ] {
            assert_eq!(ObjectType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn rect_overlap_detects_touching_edges_as_non_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn rect_overlap_detects_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn rect_contains_checks_all_edges() {
        let frame = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(frame.contains(&Rect::new(10.0, 10.0, 50.0, 50.0)));
        assert!(!frame.contains(&Rect::new(10.0, 10.0, 100.0, 50.0)));
    }
}
