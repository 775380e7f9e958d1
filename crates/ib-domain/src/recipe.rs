use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolInput;

/// A single templated action in a recipe — string values in `input_template`
/// may carry `{{paramName}}` placeholders (see §4.5 "Templatization").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub tool_name: String,
    pub input_template: ToolInput,
}

/// A learned intent → action-sequence template, replayed on matching future
/// commands instead of calling the external model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub recipe_id: String,
    pub intent_key: String,
    pub action_templates: Vec<ActionTemplate>,
    pub response_template: String,
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}
