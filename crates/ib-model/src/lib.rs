pub mod anthropic;
pub mod client;

pub use anthropic::AnthropicToolUseClient;
pub use client::{CompletionRequest, CompletionResponse, ModelClient, NoopModelClient, RequestedToolCall};
