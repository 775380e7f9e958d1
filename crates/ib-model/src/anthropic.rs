//! Adapter for the Anthropic Messages API, used with a single forced tool
//! (`board_command`) so every reply comes back as structured tool calls
//! rather than free text we'd have to parse ourselves.

use async_trait::async_trait;
use ib_domain::{Error, Result, ToolInput};
use serde_json::{json, Value};

use crate::client::{CompletionRequest, CompletionResponse, ModelClient, RequestedToolCall};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

pub struct AnthropicToolUseClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl AnthropicToolUseClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Model(format!("building http client: {e}")))?;

        Ok(Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    fn board_command_tool() -> Value {
        json!({
            "name": "board_command",
            "description": "Apply one or more actions to the whiteboard in response to the user's request.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "actions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "tool_name": {
                                    "type": "string",
                                    "enum": ["createObject", "updateObject", "moveObject", "getBoardState"]
                                },
                                "input": { "type": "object" }
                            },
                            "required": ["tool_name", "input"]
                        }
                    },
                    "response": { "type": "string" }
                },
                "required": ["actions", "response"]
            }
        })
    }

    fn build_body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "system": request.system_prompt,
            "tools": [Self::board_command_tool()],
            "tool_choice": { "type": "tool", "name": "board_command" },
            "messages": [{
                "role": "user",
                "content": format!(
                    "Board state:\n{}\n\nUser request: {}",
                    request.board_context, request.user_message
                )
            }]
        })
    }
}

#[async_trait]
impl ModelClient for AnthropicToolUseClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_body(&request);

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("provider returned {status}: {text}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("decoding response: {e}")))?;

        parse_tool_use_response(&payload)
    }
}

fn parse_tool_use_response(payload: &Value) -> Result<CompletionResponse> {
    let content = payload
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Model("response missing 'content'".to_string()))?;

    let tool_input = content
        .iter()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
        .and_then(|block| block.get("input"))
        .ok_or_else(|| Error::Model("response contained no tool_use block".to_string()))?;

    let response_text = tool_input
        .get("response")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tool_calls = tool_input
        .get("actions")
        .and_then(Value::as_array)
        .map(|actions| {
            actions
                .iter()
                .filter_map(|a| {
                    let tool_name = a.get("tool_name")?.as_str()?.to_string();
                    let input: ToolInput = a
                        .get("input")
                        .and_then(|v| v.as_object())
                        .map(|obj| obj.clone().into_iter().collect())
                        .unwrap_or_default();
                    Some(RequestedToolCall { tool_name, input })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        text: response_text,
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions_and_response_from_tool_use_block() {
        let payload = json!({
            "content": [{
                "type": "tool_use",
                "name": "board_command",
                "input": {
                    "response": "Added a sticky note.",
                    "actions": [{
                        "tool_name": "createObject",
                        "input": { "type": "sticky" }
                    }]
                }
            }]
        });

        let parsed = parse_tool_use_response(&payload).unwrap();
        assert_eq!(parsed.text, "Added a sticky note.");
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].tool_name, "createObject");
    }

    #[test]
    fn missing_tool_use_block_is_an_error() {
        let payload = json!({ "content": [{ "type": "text", "text": "hello" }] });
        assert!(parse_tool_use_response(&payload).is_err());
    }
}
