//! Security Gate — component **C9**.
//!
//! Every function here is a pure predicate: no I/O, no shared state. The
//! call sites (the WS upgrade handler and the AI HTTP endpoints) are the
//! only places that turn a `false` into a rejected connection or a `4xx`.

use std::sync::OnceLock;

use regex::Regex;

fn room_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,100}$").unwrap())
}

/// Empty allow-list ⇒ allow all. Missing origin ⇒ allow (server-to-server
/// calls don't send one). Otherwise, substring-match against the trimmed
/// list — mirrors what operators actually put in an env var CSV.
pub fn is_origin_allowed(origin: Option<&str>, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let Some(origin) = origin else {
        return true;
    };
    allowed.iter().any(|a| origin.contains(a.trim()))
}

pub fn is_valid_room_name(s: &str) -> bool {
    room_name_re().is_match(s)
}

pub fn is_ws_message_within_limit(byte_len: usize, max_frame_bytes: usize) -> bool {
    byte_len <= max_frame_bytes
}

pub fn can_add_object(current_count: usize, max_objects_per_room: usize) -> bool {
    current_count < max_objects_per_room
}

pub fn is_ai_message_valid(s: &str, max_chars: usize) -> bool {
    !s.is_empty() && s.chars().count() <= max_chars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_allows_everything() {
        assert!(is_origin_allowed(Some("https://evil.example"), &[]));
    }

    #[test]
    fn missing_origin_is_allowed() {
        assert!(is_origin_allowed(None, &["https://app.example".to_string()]));
    }

    #[test]
    fn origin_must_substring_match_an_entry() {
        let allowed = vec!["app.example".to_string()];
        assert!(is_origin_allowed(Some("https://app.example"), &allowed));
        assert!(!is_origin_allowed(Some("https://other.example"), &allowed));
    }

    #[test]
    fn room_name_boundary_lengths() {
        assert!(!is_valid_room_name(""));
        assert!(is_valid_room_name(&"a".repeat(100)));
        assert!(!is_valid_room_name(&"a".repeat(101)));
        assert!(!is_valid_room_name("has a space"));
    }

    #[test]
    fn frame_size_boundary() {
        assert!(is_ws_message_within_limit(1_048_576, 1_048_576));
        assert!(!is_ws_message_within_limit(1_048_577, 1_048_576));
    }

    #[test]
    fn object_cap_boundary() {
        assert!(can_add_object(4999, 5000));
        assert!(!can_add_object(5000, 5000));
    }

    #[test]
    fn ai_message_boundary() {
        assert!(is_ai_message_valid(&"a".repeat(2000), 2000));
        assert!(!is_ai_message_valid(&"a".repeat(2001), 2000));
        assert!(!is_ai_message_valid("", 2000));
    }
}
