//! Conversion between domain types and the `OpenAI` wire format

use manifold_core::{CompletionChunk, CompletionRequest, FinishReason, Role, ToolCall, Usage};

use crate::protocol::openai::{
    OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
    OpenAiStreamOptions, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};

// -- Outbound: domain request -> OpenAI wire request --

impl From<&CompletionRequest> for OpenAiRequest {
    fn from(req: &CompletionRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: req.messages.iter().map(Into::into).collect(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            stream: if req.stream { Some(true) } else { None },
            tools: req.tools.as_ref().map(|tools| {
                tools
                    .iter()
                    .map(|t| OpenAiTool {
                        tool_type: "function".to_owned(),
                        function: OpenAiFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect()
            }),
            stream_options: if req.stream {
                Some(OpenAiStreamOptions { include_usage: true })
            } else {
                None
            },
        }
    }
}

impl From<&manifold_core::Message> for OpenAiMessage {
    fn from(msg: &manifold_core::Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| OpenAiToolCall {
                    id: tc.id.clone(),
                    tool_type: "function".to_owned(),
                    function: OpenAiFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect()
        });

        Self {
            role: role.to_owned(),
            content: Some(msg.content.clone()),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

// -- Inbound: OpenAI wire response -> domain chunk --

/// Collapse a non-streaming response into its single terminal chunk
pub fn response_to_chunk(resp: OpenAiResponse) -> CompletionChunk {
    let choice = resp.choices.into_iter().next();

    let (content, tool_calls, finish_reason) = choice.map_or((None, None, None), |c| {
        let tool_calls = c.message.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                })
                .collect::<Vec<_>>()
        });
        (
            c.message.content,
            tool_calls.filter(|calls| !calls.is_empty()),
            c.finish_reason.as_deref().and_then(parse_finish_reason),
        )
    });

    CompletionChunk {
        id: resp.id,
        content,
        tool_calls,
        finish_reason: Some(finish_reason.unwrap_or(FinishReason::Stop)),
        usage: resp.usage.map(Into::into),
    }
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }
    }
}

/// Parse an `OpenAI` finish reason string
fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" => Some(FinishReason::ToolCalls),
        _ => None,
    }
}

// -- Stream normalization --

/// State tracker for normalizing an `OpenAI` SSE stream
///
/// Content and tool-call fragments pass through 1:1. The finish reason
/// and the trailing usage chunk are latched instead of emitted inline;
/// [`terminal`](Self::terminal) then produces the single terminal chunk
/// after `[DONE]`, synthesizing `stop` when the backend never sent a
/// finish reason at all.
#[derive(Debug, Default)]
pub struct OpenAiStreamState {
    id: Option<String>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    skipped: u64,
}

impl OpenAiStreamState {
    /// Create a fresh stream state
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one decoded stream chunk
    pub fn apply(&mut self, chunk: &OpenAiStreamChunk) -> Vec<CompletionChunk> {
        if self.id.is_none() && !chunk.id.is_empty() {
            self.id = Some(chunk.id.clone());
        }
        let id = self.stream_id();

        let mut out = Vec::new();
        for choice in &chunk.choices {
            if let Some(content) = &choice.delta.content
                && !content.is_empty()
            {
                out.push(CompletionChunk::text(id.clone(), content.clone()));
            }

            if let Some(fragments) = &choice.delta.tool_calls
                && !fragments.is_empty()
            {
                // The backend frames every fragment with its own id and
                // name, so fragments are forwarded without cross-chunk
                // accumulation; arguments may be partial until the last
                // fragment for that call.
                let calls = fragments
                    .iter()
                    .map(|tc| ToolCall {
                        id: tc.id.clone().unwrap_or_default(),
                        name: tc.function.as_ref().and_then(|f| f.name.clone()).unwrap_or_default(),
                        arguments: tc
                            .function
                            .as_ref()
                            .and_then(|f| f.arguments.clone())
                            .unwrap_or_default(),
                    })
                    .collect();
                out.push(CompletionChunk::tool_calls(id.clone(), calls));
            }

            if let Some(reason) = choice.finish_reason.as_deref().and_then(parse_finish_reason) {
                self.finish_reason = Some(reason);
            }
        }

        if let Some(usage) = &chunk.usage {
            self.usage = Some(usage.clone().into());
        }

        out
    }

    /// Record a malformed SSE payload that was skipped
    pub const fn note_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Number of malformed payloads skipped so far
    pub const fn skipped_events(&self) -> u64 {
        self.skipped
    }

    /// Produce the single terminal chunk for this stream
    pub fn terminal(&mut self) -> CompletionChunk {
        CompletionChunk::terminal(
            self.stream_id(),
            self.finish_reason.unwrap_or(FinishReason::Stop),
            self.usage.take(),
        )
    }

    // Stable across the whole stream: synthesized once if the backend
    // never supplied an id.
    fn stream_id(&mut self) -> String {
        self.id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifold_core::Message;

    fn stream_chunk(json: serde_json::Value) -> OpenAiStreamChunk {
        serde_json::from_value(json).expect("valid chunk")
    }

    #[test]
    fn non_streaming_response_yields_one_terminal_chunk() {
        let resp: OpenAiResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"message": {"content": "hi"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1},
        }))
        .expect("valid response");

        let chunk = response_to_chunk(resp);
        assert_eq!(chunk.content.as_deref(), Some("hi"));
        assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
        assert_eq!(
            chunk.usage,
            Some(Usage {
                prompt_tokens: 3,
                completion_tokens: 1
            })
        );
    }

    #[test]
    fn content_deltas_pass_through_and_finish_is_latched() {
        let mut state = OpenAiStreamState::new();

        let chunks = state.apply(&stream_chunk(serde_json::json!({
            "id": "s1", "choices": [{"delta": {"content": "hel"}}],
        })));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content.as_deref(), Some("hel"));
        assert_eq!(chunks[0].id, "s1");

        let chunks = state.apply(&stream_chunk(serde_json::json!({
            "id": "s1", "choices": [{"delta": {"content": "lo"}, "finish_reason": "length"}],
        })));
        // Finish reason is not emitted inline
        assert!(chunks.iter().all(|c| c.finish_reason.is_none()));

        let chunks = state.apply(&stream_chunk(serde_json::json!({
            "id": "s1", "choices": [], "usage": {"prompt_tokens": 5, "completion_tokens": 2},
        })));
        assert!(chunks.is_empty());

        let terminal = state.terminal();
        assert_eq!(terminal.finish_reason, Some(FinishReason::Length));
        assert_eq!(
            terminal.usage,
            Some(Usage {
                prompt_tokens: 5,
                completion_tokens: 2
            })
        );
    }

    #[test]
    fn terminal_defaults_to_stop_when_backend_sent_none() {
        let mut state = OpenAiStreamState::new();
        state.apply(&stream_chunk(serde_json::json!({
            "id": "s1", "choices": [{"delta": {"content": "hi"}}],
        })));
        assert_eq!(state.terminal().finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn tool_call_fragments_are_forwarded() {
        let mut state = OpenAiStreamState::new();
        let chunks = state.apply(&stream_chunk(serde_json::json!({
            "id": "s1",
            "choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "function": {"name": "lookup", "arguments": "{\"q\":"}}
            ]}}],
        })));

        let calls = chunks[0].tool_calls.as_ref().expect("tool calls");
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "lookup");
        assert_eq!(calls[0].arguments, "{\"q\":");
    }

    #[test]
    fn request_maps_tool_result_messages() {
        let request = CompletionRequest::new(
            "gpt-4o-mini",
            vec![
                Message::new(Role::User, "look this up"),
                Message::tool_result("call_1", "42"),
            ],
        );
        let wire: OpenAiRequest = (&request).into();

        assert_eq!(wire.messages[1].role, "tool");
        assert_eq!(wire.messages[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(wire.stream, Some(true));
        assert!(wire.stream_options.as_ref().is_some_and(|o| o.include_usage));
    }
}
