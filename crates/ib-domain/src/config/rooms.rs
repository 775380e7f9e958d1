use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Room manager / snapshot persistence (§4.2)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsConfig {
    /// How often dirty rooms are snapshotted, in milliseconds.
    #[serde(default = "d_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    /// How often the idle-eviction sweep runs, in milliseconds.
    #[serde(default = "d_eviction_check_interval_ms")]
    pub eviction_check_interval_ms: u64,
    /// A room with zero connections idle longer than this is evicted.
    #[serde(default = "d_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Path to a SQLite database file for durable snapshots. When absent,
    /// snapshots are kept in-memory only (lost on restart) — safe per
    /// §4.1: "safe to be absent".
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: d_snapshot_interval_ms(),
            eviction_check_interval_ms: d_eviction_check_interval_ms(),
            idle_timeout_ms: d_idle_timeout_ms(),
            sqlite_path: None,
        }
    }
}

fn d_snapshot_interval_ms() -> u64 {
    30_000
}
fn d_eviction_check_interval_ms() -> u64 {
    5 * 60_000
}
fn d_idle_timeout_ms() -> u64 {
    60 * 60_000
}
