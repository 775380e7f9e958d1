use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Command cache (§4.5)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "d_capacity")]
    pub capacity: usize,
    #[serde(default = "d_max_actions_per_recipe")]
    pub max_actions_per_recipe: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: d_capacity(),
            max_actions_per_recipe: d_max_actions_per_recipe(),
        }
    }
}

fn d_capacity() -> usize {
    50
}
fn d_max_actions_per_recipe() -> usize {
    20
}
