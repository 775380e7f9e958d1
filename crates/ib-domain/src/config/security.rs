use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Security gate thresholds (§4.8)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Comma-separated allow-list is split at load time; empty ⇒ allow all.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "d_max_frame_bytes")]
    pub max_frame_bytes: usize,
    #[serde(default = "d_max_objects_per_room")]
    pub max_objects_per_room: usize,
    #[serde(default = "d_max_ai_message_chars")]
    pub max_ai_message_chars: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_frame_bytes: d_max_frame_bytes(),
            max_objects_per_room: d_max_objects_per_room(),
            max_ai_message_chars: d_max_ai_message_chars(),
        }
    }
}

fn d_max_frame_bytes() -> usize {
    1_048_576
}
fn d_max_objects_per_room() -> usize {
    5000
}
fn d_max_ai_message_chars() -> usize {
    2000
}
