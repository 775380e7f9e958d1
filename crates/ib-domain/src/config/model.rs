use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// External model (§4.7) — only the tool-use contract is in scope; the
// provider's wire protocol lives behind `ib-model::ModelClient`.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Env var holding the provider API key. Unset ⇒ no external model is
    /// configured and the orchestrator always falls back to C7.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_model_name")]
    pub model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key_env: d_api_key_env(),
            model: d_model_name(),
        }
    }
}

fn d_api_key_env() -> String {
    "IB_ANTHROPIC_API_KEY".into()
}
fn d_model_name() -> String {
    "claude-sonnet".into()
}
