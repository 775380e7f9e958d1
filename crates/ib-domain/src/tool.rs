use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A loose K→V tool input, used at the ingestion layer where the model's
/// or the fallback parser's output schema is not known statically.
pub type ToolInput = HashMap<String, serde_json::Value>;

/// Record of one executed tool call. Shared wire type between the
/// orchestrator, stream events, and cache learning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAction {
    pub tool_name: String,
    pub input: ToolInput,
    /// Serialized JSON string — the tool executor's result, success or not.
    pub result: String,
}

/// The four tools exposed to both the model loop and the fallback parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    CreateObject,
    UpdateObject,
    MoveObject,
    GetBoardState,
}

impl ToolName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateObject => "createObject",
            Self::UpdateObject => "updateObject",
            Self::MoveObject => "moveObject",
            Self::GetBoardState => "getBoardState",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "createObject" => Some(Self::CreateObject),
            "updateObject" => Some(Self::UpdateObject),
            "moveObject" => Some(Self::MoveObject),
            "getBoardState" => Some(Self::GetBoardState),
            _ => None,
        }
    }
}
