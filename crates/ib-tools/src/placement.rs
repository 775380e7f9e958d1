//! Pure geometry helpers the Tool Executor uses to decide where a new
//! object lands and which frame (if any) adopts it.

use ib_crdt::BoardDocument;
use ib_domain::{BoardObject, ObjectType, Rect};

const PADDING: f64 = 20.0;
const X_MAX: f64 = 1100.0;
const MAX_ROW_ATTEMPTS: usize = 20;

/// Whether `candidate`, padded by `padding`, overlaps any existing object.
/// Frames are containers, not occupants — they never count as an obstacle,
/// so a child placed inside one isn't pushed back out of it.
fn collides(objects: &[BoardObject], candidate: &Rect, padding: f64) -> bool {
    objects
        .iter()
        .filter(|o| o.kind != ObjectType::Frame)
        .any(|o| candidate.padded(padding).overlaps(&o.rect()))
}

/// Find the first unoccupied `width x height` slot, scanning left-to-right
/// then wrapping to the next row, with `PADDING` kept clear around every
/// existing object. After `MAX_ROW_ATTEMPTS` rows with no opening, give up
/// and place the object below everything else on the board. Used when the
/// caller supplied no `x`/`y` at all.
pub fn find_free_position(doc: &BoardDocument, width: f64, height: f64) -> (f64, f64) {
    let objects = doc.all_objects();

    let mut y = PADDING;
    for _ in 0..MAX_ROW_ATTEMPTS {
        let mut x = PADDING;
        while x + width <= X_MAX {
            let candidate = Rect::new(x, y, width, height);
            if !collides(&objects, &candidate, PADDING) {
                return (x, y);
            }
            x += width + PADDING;
        }
        y += height + PADDING;
    }

    let bottom = objects
        .iter()
        .map(|o| o.rect().bottom)
        .fold(0.0_f64, f64::max);
    (PADDING, bottom + PADDING)
}

/// Collision-avoidance algorithm (§4.4) for a `createObject` call that did
/// supply `x`/`y`: use the requested position if nothing overlaps it,
/// otherwise scan rightward from it in steps of `width+PADDING` up to
/// `X_MAX`, wrapping to the next row at `y + k·(height+PADDING)`. If
/// nothing opens up after `MAX_ROW_ATTEMPTS` rows, drop below everything
/// else on the board at the originally requested `x`.
pub fn resolve_collision(doc: &BoardDocument, x: f64, y: f64, width: f64, height: f64) -> (f64, f64) {
    let objects = doc.all_objects();
    let requested = Rect::new(x, y, width, height);
    if !collides(&objects, &requested, PADDING) {
        return (x, y);
    }

    for k in 0..MAX_ROW_ATTEMPTS {
        let row_y = y + k as f64 * (height + PADDING);
        let mut cx = x;
        while cx + width <= X_MAX {
            let candidate = Rect::new(cx, row_y, width, height);
            if !collides(&objects, &candidate, PADDING) {
                return (cx, row_y);
            }
            cx += width + PADDING;
        }
    }

    let bottom = objects
        .iter()
        .map(|o| o.rect().bottom)
        .fold(0.0_f64, f64::max);
    (x, bottom + PADDING)
}

/// The smallest frame whose bounds fully contain `rect`, if any — used to
/// auto-set `parentId` when a caller doesn't specify one.
pub fn find_containing_frame(doc: &BoardDocument, rect: &Rect) -> Option<String> {
    doc.all_objects()
        .into_iter()
        .filter(|o| o.kind == ObjectType::Frame)
        .filter(|o| o.rect().contains(rect))
        .min_by(|a, b| {
            let area = |r: &Rect| r.width() * r.height();
            area(&a.rect())
                .partial_cmp(&area(&b.rect()))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|o| o.id)
}

/// Centroid of a set of objects' bounding-box centers.
pub fn centroid(objects: &[BoardObject]) -> (f64, f64) {
    if objects.is_empty() {
        return (0.0, 0.0);
    }
    let (mut sx, mut sy) = (0.0, 0.0);
    for o in objects {
        let r = o.rect();
        sx += (r.x + r.right) / 2.0;
        sy += (r.y + r.bottom) / 2.0;
    }
    let n = objects.len() as f64;
    (sx / n, sy / n)
}

/// Smallest axis-aligned rect containing every object, or `None` for an
/// empty board.
pub fn bounding_box(objects: &[BoardObject]) -> Option<Rect> {
    objects.iter().map(|o| o.rect()).reduce(|a, b| Rect {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        right: a.right.max(b.right),
        bottom: a.bottom.max(b.bottom),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sticky(id: &str, x: f64, y: f64) -> BoardObject {
        BoardObject {
            id: id.to_string(),
            kind: ObjectType::Sticky,
            x,
            y,
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
        }
    }

    #[test]
    fn find_free_position_on_empty_board_picks_origin_padding() {
        let doc = BoardDocument::new();
        let (x, y) = find_free_position(&doc, 200.0, 150.0);
        assert_eq!((x, y), (20.0, 20.0));
    }

    #[test]
    fn find_free_position_skips_occupied_slot() {
        let doc = BoardDocument::new();
        doc.insert_object(sticky("a", 20.0, 20.0)).unwrap();
        let (x, y) = find_free_position(&doc, 200.0, 150.0);
        assert!(x > 20.0 || y > 20.0);
    }

    #[test]
    fn containing_frame_picks_smallest_enclosing_frame() {
        let doc = BoardDocument::new();
        let mut big_frame = sticky("big", 0.0, 0.0);
        big_frame.kind = ObjectType::Frame;
        big_frame.width = 1000.0;
        big_frame.height = 1000.0;
        let mut small_frame = sticky("small", 50.0, 50.0);
        small_frame.kind = ObjectType::Frame;
        small_frame.width = 300.0;
        small_frame.height = 300.0;
        doc.insert_object(big_frame).unwrap();
        doc.insert_object(small_frame).unwrap();

        let target = Rect::new(60.0, 60.0, 50.0, 50.0);
        assert_eq!(find_containing_frame(&doc, &target), Some("small".to_string()));
    }

    #[test]
    fn bounding_box_of_empty_board_is_none() {
        assert!(bounding_box(&[]).is_none());
    }

    #[test]
    fn resolve_collision_uses_requested_position_when_clear() {
        let doc = BoardDocument::new();
        let (x, y) = resolve_collision(&doc, 500.0, 500.0, 200.0, 150.0);
        assert_eq!((x, y), (500.0, 500.0));
    }

    #[test]
    fn resolve_collision_moves_off_an_occupied_request() {
        let doc = BoardDocument::new();
        doc.insert_object(sticky("a", 100.0, 100.0)).unwrap();
        let (x, y) = resolve_collision(&doc, 100.0, 100.0, 200.0, 150.0);
        assert_ne!((x, y), (100.0, 100.0));
        let moved = Rect::new(x, y, 200.0, 150.0);
        assert!(!moved.overlaps(&Rect::new(100.0, 100.0, 200.0, 150.0)));
    }

    #[test]
    fn resolve_collision_ignores_frames_as_obstacles() {
        let doc = BoardDocument::new();
        let mut frame = sticky("frame", 0.0, 0.0);
        frame.kind = ObjectType::Frame;
        frame.width = 500.0;
        frame.height = 500.0;
        doc.insert_object(frame).unwrap();

        let (x, y) = resolve_collision(&doc, 50.0, 50.0, 200.0, 150.0);
        assert_eq!((x, y), (50.0, 50.0));
    }
}
