//! Conversion between domain types and the Anthropic wire format

use manifold_core::{
    CompletionChunk, CompletionRequest, FinishReason, ProviderError, ProviderErrorKind, Role, ToolCall, Usage,
};

use crate::protocol::anthropic::{
    AnthropicContent, AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse,
    AnthropicResponseBlock, AnthropicStreamContentBlock, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicTool,
    AnthropicUsage,
};

/// Default max tokens when the request does not specify one (the field
/// is required by the Messages API)
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Content prefix marking reasoning text
const THINKING_PREFIX: &str = "[thinking] ";

// -- Outbound: domain request -> Anthropic wire request --

impl From<&CompletionRequest> for AnthropicRequest {
    fn from(req: &CompletionRequest) -> Self {
        let mut system: Option<String> = None;
        let mut messages = Vec::new();

        for msg in &req.messages {
            match msg.role {
                // System prompts live in a top-level field, not in messages
                Role::System => match &mut system {
                    Some(existing) => {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    }
                    None => system = Some(msg.content.clone()),
                },
                Role::Tool => {
                    messages.push(AnthropicMessage {
                        role: "user".to_owned(),
                        content: AnthropicContent::Blocks(vec![AnthropicContentBlock::ToolResult {
                            tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                            content: Some(msg.content.clone()),
                        }]),
                    });
                }
                Role::Assistant if msg.tool_calls.is_some() => {
                    let mut blocks = Vec::new();
                    if !msg.content.is_empty() {
                        blocks.push(AnthropicContentBlock::Text {
                            text: msg.content.clone(),
                        });
                    }
                    for tc in msg.tool_calls.as_deref().unwrap_or_default() {
                        let input = serde_json::from_str(&tc.arguments).unwrap_or_else(|_| serde_json::json!({}));
                        blocks.push(AnthropicContentBlock::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input,
                        });
                    }
                    messages.push(AnthropicMessage {
                        role: "assistant".to_owned(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::User | Role::Assistant => {
                    let role = if msg.role == Role::Assistant { "assistant" } else { "user" };
                    messages.push(AnthropicMessage {
                        role: role.to_owned(),
                        content: AnthropicContent::Text(msg.content.clone()),
                    });
                }
            }
        }

        let tools = req.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.parameters.clone(),
                })
                .collect()
        });

        Self {
            model: req.model.clone(),
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: req.temperature,
            stream: if req.stream { Some(true) } else { None },
            tools,
        }
    }
}

// -- Inbound: Anthropic wire response -> domain chunk --

/// Collapse a non-streaming response into its single terminal chunk
pub fn response_to_chunk(resp: AnthropicResponse) -> CompletionChunk {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in resp.content {
        match block {
            AnthropicResponseBlock::Text { text } => content.push_str(&text),
            AnthropicResponseBlock::Thinking { thinking } => {
                content.push_str(THINKING_PREFIX);
                content.push_str(&thinking);
                content.push_str("\n\n");
            }
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                let arguments = serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_owned());
                tool_calls.push(ToolCall { id, name, arguments });
            }
        }
    }

    CompletionChunk {
        id: resp.id,
        content: if content.is_empty() { None } else { Some(content) },
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        finish_reason: Some(
            resp.stop_reason
                .as_deref()
                .and_then(parse_stop_reason)
                .unwrap_or(FinishReason::Stop),
        ),
        usage: Some(resp.usage.into()),
    }
}

impl From<AnthropicUsage> for Usage {
    fn from(usage: AnthropicUsage) -> Self {
        Self {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
        }
    }
}

/// Map an Anthropic stop reason onto the domain taxonomy
fn parse_stop_reason(s: &str) -> Option<FinishReason> {
    match s {
        "end_turn" | "stop" | "stop_sequence" => Some(FinishReason::Stop),
        "max_tokens" => Some(FinishReason::Length),
        "tool_use" => Some(FinishReason::ToolCalls),
        _ => None,
    }
}

/// Map an Anthropic error event type onto the domain taxonomy
pub(crate) fn error_kind(error_type: &str) -> ProviderErrorKind {
    match error_type {
        "authentication_error" => ProviderErrorKind::Authentication,
        "permission_error" => ProviderErrorKind::Permission,
        "not_found_error" => ProviderErrorKind::NotFound,
        "rate_limit_error" => ProviderErrorKind::RateLimit,
        "invalid_request_error" => ProviderErrorKind::Validation,
        "overloaded_error" | "api_error" => ProviderErrorKind::Server,
        _ => ProviderErrorKind::Unknown,
    }
}

// -- Stream normalization --

/// Open accumulator for one `tool_use` block
#[derive(Debug)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

/// State tracker for normalizing an Anthropic typed-event stream
///
/// Tool-argument fragments are concatenated internally and the
/// assembled call is emitted as a single chunk on `content_block_stop`,
/// so callers never see a partial fragment. `error` events raise
/// immediately; they are backend-reported failures, not decode noise.
#[derive(Debug)]
pub struct AnthropicStreamState {
    provider: String,
    id: Option<String>,
    tool: Option<ToolCallAccumulator>,
    thinking_open: bool,
    finish_reason: Option<FinishReason>,
    input_tokens: u32,
    output_tokens: u32,
    done: bool,
    skipped: u64,
}

impl AnthropicStreamState {
    /// Create a fresh stream state for the named provider
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: None,
            tool: None,
            thinking_open: false,
            finish_reason: None,
            input_tokens: 0,
            output_tokens: 0,
            done: false,
            skipped: 0,
        }
    }

    /// Normalize one decoded stream event
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the backend reports an `error`
    /// event mid-stream.
    pub fn apply(&mut self, event: &AnthropicStreamEvent) -> Result<Vec<CompletionChunk>, ProviderError> {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.id = Some(message.id.clone());
                if let Some(usage) = &message.usage {
                    self.input_tokens = usage.input_tokens;
                }
                Ok(Vec::new())
            }

            AnthropicStreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                AnthropicStreamContentBlock::Text { .. } => Ok(Vec::new()),
                AnthropicStreamContentBlock::Thinking { thinking } => {
                    self.thinking_open = true;
                    let mut text = THINKING_PREFIX.to_owned();
                    text.push_str(thinking);
                    Ok(vec![CompletionChunk::text(self.stream_id(), text)])
                }
                AnthropicStreamContentBlock::ToolUse { id, name } => {
                    self.tool = Some(ToolCallAccumulator {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: String::new(),
                    });
                    Ok(Vec::new())
                }
            },

            AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                AnthropicStreamDelta::TextDelta { text } => {
                    Ok(vec![CompletionChunk::text(self.stream_id(), text.clone())])
                }
                AnthropicStreamDelta::ThinkingDelta { thinking } => {
                    Ok(vec![CompletionChunk::text(self.stream_id(), thinking.clone())])
                }
                AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                    if let Some(tool) = &mut self.tool {
                        tool.arguments.push_str(partial_json);
                    }
                    Ok(Vec::new())
                }
                AnthropicStreamDelta::SignatureDelta { .. } => Ok(Vec::new()),
            },

            AnthropicStreamEvent::ContentBlockStop { .. } => {
                if let Some(tool) = self.tool.take() {
                    let call = ToolCall {
                        id: tool.id,
                        name: tool.name,
                        arguments: if tool.arguments.is_empty() {
                            "{}".to_owned()
                        } else {
                            tool.arguments
                        },
                    };
                    return Ok(vec![CompletionChunk::tool_calls(self.stream_id(), vec![call])]);
                }
                // Closing a thinking block emits the same separator the
                // non-streaming path inserts, so concatenated streamed
                // content matches the collapsed response text.
                if self.thinking_open {
                    self.thinking_open = false;
                    return Ok(vec![CompletionChunk::text(self.stream_id(), "\n\n".to_owned())]);
                }
                Ok(Vec::new())
            }

            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason.as_deref().and_then(parse_stop_reason) {
                    self.finish_reason = Some(reason);
                }
                if let Some(usage) = usage {
                    self.output_tokens = usage.output_tokens;
                }
                Ok(Vec::new())
            }

            AnthropicStreamEvent::MessageStop => {
                self.done = true;
                let usage = Usage {
                    prompt_tokens: self.input_tokens,
                    completion_tokens: self.output_tokens,
                };
                Ok(vec![CompletionChunk::terminal(
                    self.stream_id(),
                    self.finish_reason.unwrap_or(FinishReason::Stop),
                    Some(usage),
                )])
            }

            AnthropicStreamEvent::Error { error } => Err(ProviderError::new(
                error.message.clone(),
                error_kind(&error.error_type),
                self.provider.clone(),
            )),

            AnthropicStreamEvent::Ping | AnthropicStreamEvent::Unknown => Ok(Vec::new()),
        }
    }

    /// Whether `message_stop` has been observed
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Record a malformed SSE payload that was skipped
    pub const fn note_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Number of malformed payloads skipped so far
    pub const fn skipped_events(&self) -> u64 {
        self.skipped
    }

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

    fn event(json: serde_json::Value) -> AnthropicStreamEvent {
        serde_json::from_value(json).expect("valid event")
    }

    #[test]
    fn tool_arguments_accumulate_until_block_stop() {
        let mut state = AnthropicStreamState::new("anthropic");

        let chunks = state
            .apply(&event(serde_json::json!({
                "type": "content_block_start", "index": 0,
                "content_block": {"type": "tool_use", "id": "t1", "name": "foo"},
            })))
            .expect("ok");
        assert!(chunks.is_empty());

        for fragment in ["{\"a\":", "1}"] {
            let chunks = state
                .apply(&event(serde_json::json!({
                    "type": "content_block_delta", "index": 0,
                    "delta": {"type": "input_json_delta", "partial_json": fragment},
                })))
                .expect("ok");
            // Never emitted mid-fragment
            assert!(chunks.is_empty());
        }

        let chunks = state
            .apply(&event(serde_json::json!({"type": "content_block_stop", "index": 0})))
            .expect("ok");
        let calls = chunks[0].tool_calls.as_ref().expect("tool calls");
        assert_eq!(calls[0], ToolCall {
            id: "t1".to_owned(),
            name: "foo".to_owned(),
            arguments: "{\"a\":1}".to_owned(),
        });
        serde_json::from_str::<serde_json::Value>(&calls[0].arguments).expect("assembled arguments parse");
    }

    #[test]
    fn thinking_is_prefixed_and_streams_as_content() {
        let mut state = AnthropicStreamState::new("anthropic");

        let start = state
            .apply(&event(serde_json::json!({
                "type": "content_block_start", "index": 0,
                "content_block": {"type": "thinking", "thinking": ""},
            })))
            .expect("ok");
        assert_eq!(start[0].content.as_deref(), Some("[thinking] "));

        let delta = state
            .apply(&event(serde_json::json!({
                "type": "content_block_delta", "index": 0,
                "delta": {"type": "thinking_delta", "thinking": "hmm"},
            })))
            .expect("ok");
        assert_eq!(delta[0].content.as_deref(), Some("hmm"));
    }

    #[test]
    fn streamed_thinking_concatenation_matches_collapsed_response() {
        let mut state = AnthropicStreamState::new("anthropic");
        let events = [
            serde_json::json!({
                "type": "content_block_start", "index": 0,
                "content_block": {"type": "thinking", "thinking": ""},
            }),
            serde_json::json!({
                "type": "content_block_delta", "index": 0,
                "delta": {"type": "thinking_delta", "thinking": "reasoning"},
            }),
            serde_json::json!({"type": "content_block_stop", "index": 0}),
            serde_json::json!({
                "type": "content_block_start", "index": 1,
                "content_block": {"type": "text", "text": ""},
            }),
            serde_json::json!({
                "type": "content_block_delta", "index": 1,
                "delta": {"type": "text_delta", "text": "answer"},
            }),
            serde_json::json!({"type": "content_block_stop", "index": 1}),
        ];

        let mut streamed = String::new();
        for ev in events {
            for chunk in state.apply(&event(ev)).expect("ok") {
                streamed.push_str(chunk.content.as_deref().unwrap_or_default());
            }
        }

        let resp: AnthropicResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_3",
            "content": [
                {"type": "thinking", "thinking": "reasoning"},
                {"type": "text", "text": "answer"},
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1},
        }))
        .expect("valid response");

        assert_eq!(Some(streamed.as_str()), response_to_chunk(resp).content.as_deref());
        assert_eq!(streamed, "[thinking] reasoning\n\nanswer");
    }

    #[test]
    fn message_stop_emits_terminal_with_usage() {
        let mut state = AnthropicStreamState::new("anthropic");

        state
            .apply(&event(serde_json::json!({
                "type": "message_start",
                "message": {"id": "msg_1", "usage": {"input_tokens": 10, "output_tokens": 0}},
            })))
            .expect("ok");
        state
            .apply(&event(serde_json::json!({
                "type": "message_delta",
                "delta": {"stop_reason": "tool_use"},
                "usage": {"input_tokens": 0, "output_tokens": 7},
            })))
            .expect("ok");

        let chunks = state.apply(&event(serde_json::json!({"type": "message_stop"}))).expect("ok");
        assert!(state.is_done());
        assert_eq!(chunks[0].id, "msg_1");
        assert_eq!(chunks[0].finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(
            chunks[0].usage,
            Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 7
            })
        );
    }

    #[test]
    fn error_event_raises_immediately() {
        let mut state = AnthropicStreamState::new("anthropic");
        let err = state
            .apply(&event(serde_json::json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"},
            })))
            .expect_err("error event");

        assert_eq!(err.kind, ProviderErrorKind::Server);
        assert_eq!(err.provider, "anthropic");
        assert!(err.is_retryable());
    }

    #[test]
    fn unknown_event_types_are_tolerated() {
        let mut state = AnthropicStreamState::new("anthropic");
        let chunks = state
            .apply(&event(serde_json::json!({"type": "content_block_heartbeat"})))
            .expect("ok");
        assert!(chunks.is_empty());
    }

    #[test]
    fn system_messages_lift_into_top_level_field() {
        let request = CompletionRequest::new(
            "claude-sonnet-4-20250514",
            vec![
                Message::new(Role::System, "be brief"),
                Message::new(Role::User, "hi"),
                Message::tool_result("t1", "42"),
            ],
        );
        let wire: AnthropicRequest = (&request).into();

        assert_eq!(wire.system.as_deref(), Some("be brief"));
        assert_eq!(wire.messages.len(), 2);
        assert_eq!(wire.max_tokens, DEFAULT_MAX_TOKENS);
        // Tool results travel as user-role tool_result blocks
        assert_eq!(wire.messages[1].role, "user");
    }

    #[test]
    fn non_streaming_response_collapses_blocks() {
        let resp: AnthropicResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_2",
            "content": [
                {"type": "thinking", "thinking": "reasoning"},
                {"type": "text", "text": "answer"},
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 4, "output_tokens": 2},
        }))
        .expect("valid response");

        let chunk = response_to_chunk(resp);
        assert_eq!(chunk.content.as_deref(), Some("[thinking] reasoning\n\nanswer"));
        assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
    }
}
