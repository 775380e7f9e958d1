//! The provider-agnostic seam between the AI Orchestrator and whichever
//! external model answers a natural-language command. Only the shape the
//! orchestrator needs is exposed here — the wire protocol of any given
//! provider lives entirely inside its adapter.

use async_trait::async_trait;
use ib_domain::{Result, ToolInput};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub board_context: Value,
    /// Token budget for this turn — the orchestrator scales this with its
    /// complexity classification (§4.7: 2048 for complex commands, 512 for
    /// simple ones).
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub tool_calls: Vec<RequestedToolCall>,
}

#[derive(Debug, Clone)]
pub struct RequestedToolCall {
    pub tool_name: String,
    pub input: ToolInput,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Stands in when no provider is configured (`model.api_key_env` unset).
/// The orchestrator treats its error as an immediate signal to fall back
/// to the local parser rather than retrying.
pub struct NoopModelClient;

#[async_trait]
impl ModelClient for NoopModelClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        Err(ib_domain::Error::Model("no model provider configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_client_always_errors() {
        let client = NoopModelClient;
        let result = client
            .complete(CompletionRequest {
                system_prompt: String::new(),
                user_message: "hi".to_string(),
                board_context: Value::Null,
                max_tokens: 512,
            })
            .await;
        assert!(result.is_err());
    }
}
