use serde::{Deserialize, Serialize};

use crate::tool::ToolAction;

/// Events emitted incrementally by the AI orchestrator, per §3 "StreamEvent".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "status")]
    Status { state: String },

    #[serde(rename = "text_delta")]
    TextDelta { chunk: String },

    #[serde(rename = "tool_result")]
    ToolResult { action: ToolAction },

    #[serde(rename = "done")]
    Done {
        message: String,
        actions: Vec<ToolAction>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        cached: bool,
    },

    #[serde(rename = "error")]
    Error { message: String },
}
