//! LLM client module.
//!
//! Defines the chat message types exchanged with an OpenAI-compatible
//! chat-completions API, the streamed chunk model, and the [`LlmClient`]
//! trait the agent talks to. The provider itself is an opaque collaborator:
//! the agent only relies on the request/response contract below.

mod openrouter;
mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use openrouter::OpenRouterClient;
pub use sse::{decode_chat_stream, ChatStreamDecoder};

/// Errors returned by the model provider boundary.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant turn that requested tools. Empty text is sent as no content.
    pub fn assistant(content: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name plus raw JSON arguments, exactly as the model produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Tool definition advertised to the model (OpenAI `tools` format).
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

fn function_type() -> String {
    "function".to_string()
}

/// One item of a streamed model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Text delta, in arrival order.
    Text(String),
    /// A fully accumulated tool call.
    ToolCall(ToolCall),
    /// The model finished its turn.
    Done { finish_reason: Option<String> },
}

/// Lazily consumed sequence of chunks for one model turn.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

/// Trait for streaming chat-completion providers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Start one model turn over the full message history.
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatStream, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_message_serializes_tool_calls() {
        let msg = ChatMessage::assistant(
            String::new(),
            vec![ToolCall::new("call_1", "generate_commit_message", "{\"diffs\":[]}")],
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "generate_commit_message", "arguments": "{\"diffs\":[]}"}
                }]
            })
        );
    }

    #[test]
    fn tool_result_carries_call_id() {
        let value = serde_json::to_value(ChatMessage::tool_result("call_9", "ok")).unwrap();
        assert_eq!(value, json!({"role": "tool", "content": "ok", "tool_call_id": "call_9"}));
    }
}
