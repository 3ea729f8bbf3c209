//! OpenRouter (OpenAI-compatible) streaming chat client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{decode_chat_stream, ChatMessage, ChatStream, LlmClient, LlmError, ToolSchema};
use crate::config::DEFAULT_BASE_URL;

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (e.g. a local proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSchema]>,
    stream: bool,
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatStream, LlmError> {
        let request = ChatRequest {
            model,
            messages,
            tools: tools.filter(|t| !t.is_empty()),
            stream: true,
        };

        tracing::debug!(model, messages = messages.len(), "Sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Box::pin(decode_chat_stream(response.bytes_stream())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FunctionSchema;
    use serde_json::json;

    #[test]
    fn request_body_omits_empty_tool_list() {
        let messages = vec![ChatMessage::user("hi")];
        let tools: Vec<ToolSchema> = Vec::new();
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            tools: Some(tools.as_slice()).filter(|t| !t.is_empty()),
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert_eq!(value["stream"], json!(true));
    }

    #[test]
    fn request_body_includes_tools() {
        let messages = vec![ChatMessage::user("hi")];
        let tools = vec![ToolSchema {
            tool_type: "function".to_string(),
            function: FunctionSchema {
                name: "write_review_to_file".to_string(),
                description: "Writes a code review to a markdown file".to_string(),
                parameters: json!({"type": "object"}),
            },
        }];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            tools: Some(tools.as_slice()),
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tools"][0]["function"]["name"], "write_review_to_file");
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OpenRouterClient::new("k".into()).with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
