//! Server-sent-event decoding for streamed chat completions.
//!
//! Event framing is handled by `eventsource-stream`; this module turns each
//! event's `data` payload into [`StreamChunk`]s. Text deltas are emitted as
//! soon as they arrive; tool-call deltas arrive as fragments keyed by
//! `index` and are only emitted once the choice reports a `finish_reason`,
//! `[DONE]` is seen, or the byte stream ends.

use std::collections::{BTreeMap, VecDeque};

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::{LlmError, StreamChunk, ToolCall};

/// Incremental decoder from SSE event payloads to [`StreamChunk`]s.
#[derive(Debug, Default)]
pub struct ChatStreamDecoder {
    tool_calls: BTreeMap<usize, PartialToolCall>,
    finished: bool,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl ChatStreamDecoder {
    /// Decode the `data` of one event, returning every chunk it completes.
    pub fn decode_event(&mut self, data: &str) -> Result<Vec<StreamChunk>, LlmError> {
        let mut out = Vec::new();
        let data = data.trim();
        if data.is_empty() || self.finished {
            return Ok(out);
        }
        if data == "[DONE]" {
            self.complete(None, &mut out);
            return Ok(out);
        }

        let event: StreamEvent =
            serde_json::from_str(data).map_err(|e| LlmError::Decode(format!("{}: {}", e, data)))?;

        if let Some(error) = event.error {
            return Err(LlmError::Stream(error.message));
        }

        let Some(choice) = event.choices.into_iter().next() else {
            return Ok(out);
        };

        if let Some(delta) = choice.delta {
            if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
                out.push(StreamChunk::Text(content));
            }
            for fragment in delta.tool_calls.unwrap_or_default() {
                let entry = self.tool_calls.entry(fragment.index).or_default();
                if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
                    entry.id = id;
                }
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                        entry.name = name;
                    }
                    if let Some(arguments) = function.arguments {
                        entry.arguments.push_str(&arguments);
                    }
                }
            }
        }

        if let Some(reason) = choice.finish_reason {
            self.complete(Some(reason), &mut out);
        }
        Ok(out)
    }

    /// Close the turn at end of stream if the provider never signalled
    /// completion.
    pub fn finish(&mut self) -> Vec<StreamChunk> {
        let mut out = Vec::new();
        if !self.finished {
            self.complete(None, &mut out);
        }
        out
    }

    fn complete(&mut self, finish_reason: Option<String>, out: &mut Vec<StreamChunk>) {
        for (index, call) in std::mem::take(&mut self.tool_calls) {
            if call.name.is_empty() {
                tracing::warn!(index, "Dropping streamed tool call without a name");
                continue;
            }
            let id = if call.id.is_empty() {
                format!("call_{}", index)
            } else {
                call.id
            };
            let arguments = if call.arguments.trim().is_empty() {
                "{}".to_string()
            } else {
                call.arguments
            };
            out.push(StreamChunk::ToolCall(ToolCall::new(id, call.name, arguments)));
        }
        out.push(StreamChunk::Done { finish_reason });
        self.finished = true;
    }
}

/// Turn a provider byte stream into a stream of decoded chunks.
pub fn decode_chat_stream<S, E>(
    inner: S,
) -> impl Stream<Item = Result<StreamChunk, LlmError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures::stream::unfold(
        (
            Box::pin(inner).eventsource(),
            ChatStreamDecoder::default(),
            VecDeque::new(),
            false,
        ),
        |(mut events, mut decoder, mut pending, mut ended)| async move {
            loop {
                if let Some(chunk) = pending.pop_front() {
                    return Some((Ok(chunk), (events, decoder, pending, ended)));
                }
                if ended {
                    return None;
                }

                let decoded = match events.next().await {
                    Some(Ok(event)) => {
                        tracing::trace!(data = %event.data, "SSE event");
                        decoder.decode_event(&event.data)
                    }
                    Some(Err(e)) => Err(LlmError::Stream(e.to_string())),
                    None => {
                        ended = true;
                        Ok(decoder.finish())
                    }
                };

                match decoded {
                    Ok(chunks) => pending.extend(chunks),
                    Err(e) => {
                        ended = true;
                        pending.clear();
                        return Some((Err(e), (events, decoder, pending, ended)));
                    }
                }
            }
        },
    )
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallFragment>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallFragment {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionFragment>,
}

#[derive(Debug, Deserialize)]
struct FunctionFragment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
