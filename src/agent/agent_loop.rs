//! Core agent loop implementation.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::llm::{ChatMessage, LlmClient, LlmError, OpenRouterClient, StreamChunk, ToolCall};
use crate::tools::{parse_arguments, ToolContext, ToolError, ToolRegistry};

use super::prompt::build_system_prompt;
use super::session::{Session, SessionOutcome, SessionReport, ToolInvocation};

/// Failures that end a session early.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool failed: {0}")]
    Tool(#[source] ToolError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// The review agent.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    ctx: ToolContext,
}

impl Agent {
    /// Create a new agent talking to the configured provider.
    pub fn new(config: Config) -> Self {
        let llm = Arc::new(
            OpenRouterClient::new(config.api_key.clone()).with_base_url(config.base_url.clone()),
        );
        Self::with_client(config, llm)
    }

    /// Create an agent with an explicit model client.
    pub fn with_client(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        let ctx = ToolContext::from_config(&config);
        Self {
            config,
            llm,
            tools: ToolRegistry::new(),
            ctx,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the configured instruction, streaming model text into `out`.
    pub async fn run<W>(&self, out: &mut W) -> Result<SessionReport, AgentError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.run_instruction(&self.config.instruction, out).await
    }

    /// Run one session for `instruction`.
    ///
    /// Text deltas are written and flushed as they arrive. Tool calls are
    /// executed one at a time, in the order requested, before the next model
    /// step. The session stops when the model answers without tool calls or
    /// when `max_steps` model steps have been taken.
    pub async fn run_instruction<W>(
        &self,
        instruction: &str,
        out: &mut W,
    ) -> Result<SessionReport, AgentError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut session = Session::new(self.config.max_steps);

        let system_prompt = build_system_prompt(
            &self.ctx.workspace.to_string_lossy(),
            &self.ctx.default_output_file,
            &self.tools,
        );
        let mut messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(instruction),
        ];

        let tool_schemas = self.tools.get_tool_schemas();

        while let Some(step) = session.begin_step() {
            tracing::debug!("Agent step {}/{}", step, session.max_steps());

            let mut stream = self
                .llm
                .stream_chat(&self.config.model, &messages, Some(tool_schemas.as_slice()))
                .await?;

            let mut text = String::new();
            let mut tool_calls: Vec<ToolCall> = Vec::new();

            while let Some(chunk) = stream.next().await {
                match chunk? {
                    StreamChunk::Text(delta) => {
                        out.write_all(delta.as_bytes()).await?;
                        out.flush().await?;
                        session.push_text(&delta);
                        text.push_str(&delta);
                    }
                    StreamChunk::ToolCall(call) => tool_calls.push(call),
                    StreamChunk::Done { finish_reason } => {
                        tracing::debug!(?finish_reason, "Model turn finished");
                        break;
                    }
                }
            }

            if tool_calls.is_empty() {
                tracing::info!(steps = step, "Session completed");
                return Ok(SessionReport {
                    outcome: SessionOutcome::Completed,
                    session,
                });
            }

            messages.push(ChatMessage::assistant(text, tool_calls.clone()));

            for tool_call in &tool_calls {
                tracing::info!(
                    tool = %tool_call.function.name,
                    args = %truncate(&tool_call.function.arguments),
                    "Calling tool"
                );

                let (succeeded, content) = match self.execute_tool_call(tool_call).await {
                    Ok(output) => (true, render_tool_output(output)),
                    Err(e) if e.is_fatal() => {
                        tracing::error!(tool = %tool_call.function.name, error = %e, "Tool failed fatally");
                        return Err(AgentError::Tool(e));
                    }
                    Err(e) => {
                        tracing::warn!(tool = %tool_call.function.name, error = %e, "Tool call failed");
                        (false, format!("Error: {}", e))
                    }
                };

                tracing::debug!(result = %truncate(&content), "Tool result");
                session.record(ToolInvocation::new(step, tool_call, succeeded, &content));
                messages.push(ChatMessage::tool_result(tool_call.id.clone(), content));
            }
        }

        tracing::warn!(
            max_steps = session.max_steps(),
            "Step cap reached before the model finished"
        );
        Ok(SessionReport {
            outcome: SessionOutcome::StepCapReached,
            session,
        })
    }

    /// Execute a single tool call.
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> Result<Value, ToolError> {
        let args = parse_arguments(&tool_call.function.arguments)?;
        self.tools
            .execute(&tool_call.function.name, args, &self.ctx)
            .await
    }
}

/// Strings go back to the model verbatim; anything else as JSON.
fn render_tool_output(output: Value) -> String {
    match output {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn truncate(s: &str) -> String {
    super::session::truncate_for_log(s, 200)
}
