mod cache;
mod model;
mod rooms;
mod security;
mod server;

pub use cache::*;
pub use model::*;
pub use rooms::*;
pub use security::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rooms: RoomsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut issues = Vec::new();

        if self.security.max_frame_bytes == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "security.max_frame_bytes".into(),
                message: "must be > 0".into(),
            });
        }
        if self.security.max_objects_per_room == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "security.max_objects_per_room".into(),
                message: "must be > 0".into(),
            });
        }
        if self.cache.capacity == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "cache.capacity".into(),
                message: "capacity of 0 disables the command cache entirely".into(),
            });
        }
        if self.rooms.snapshot_interval_ms == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "rooms.snapshot_interval_ms".into(),
                message: "0 means the snapshot tick spins without pausing".into(),
            });
        }
        if self.rooms.sqlite_path.is_none() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "rooms.sqlite_path".into(),
                message: "no snapshot store configured — room state is lost on restart".into(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_only_warnings() {
        let config = Config::default();
        let issues = config.validate();
        assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn zero_frame_bytes_is_an_error() {
        let mut config = Config::default();
        config.security.max_frame_bytes = 0;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == "security.max_frame_bytes"));
    }
}
