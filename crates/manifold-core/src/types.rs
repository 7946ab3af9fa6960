//! Canonical request/response types
//!
//! These types are provider-agnostic: every backend wire format converts
//! to and from them, and nothing backend-specific leaks through.

use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool/function result
    Tool,
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message text
    pub content: String,
    /// ID of the tool call this message is a response to (role = tool)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls made by the assistant (when replaying a tool-call turn)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    /// Create a plain message with the given role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Create a tool-result message responding to `tool_call_id`
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

/// A tool/function invocation requested by the model
///
/// `arguments` is always a JSON string. Backends that fragment arguments
/// across stream events assemble them before a `ToolCall` is emitted, so
/// the value a caller receives on a tool-call-carrying chunk is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call
    pub id: String,
    /// Function name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// Definition of a tool the model can call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the function parameters
    pub parameters: serde_json::Value,
}

/// Completion request passed into exactly one provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Ordered conversation messages
    pub messages: Vec<Message>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tool definitions available to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Whether to stream the response
    #[serde(default = "default_stream")]
    pub stream: bool,
}

const fn default_stream() -> bool {
    true
}

impl CompletionRequest {
    /// Create a streaming request with default generation parameters
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            tools: None,
            stream: true,
        }
    }
}

/// Reason a completion stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the token limit
    Length,
    /// Model requested tool execution
    ToolCalls,
    /// Generation ended because of a backend error
    Error,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
}

/// One incremental unit of a completion response
///
/// Within a single stream at most one chunk carries `usage` or a
/// non-null `finish_reason`, and it is always the last chunk emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChunk {
    /// Backend message/stream id, stable across one stream
    pub id: String,
    /// Incremental (streaming) or full (non-streaming) text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Completed tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Present on the terminal chunk only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Present on the terminal chunk only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CompletionChunk {
    /// A content-only chunk
    pub fn text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(content.into()),
            tool_calls: None,
            finish_reason: None,
            usage: None,
        }
    }

    /// A chunk carrying completed tool calls
    pub fn tool_calls(id: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            id: id.into(),
            content: None,
            tool_calls: Some(calls),
            finish_reason: None,
            usage: None,
        }
    }

    /// The terminal chunk of a stream
    pub fn terminal(id: impl Into<String>, finish_reason: FinishReason, usage: Option<Usage>) -> Self {
        Self {
            id: id.into(),
            content: None,
            tool_calls: None,
            finish_reason: Some(finish_reason),
            usage,
        }
    }

    /// Whether this chunk terminates its stream
    pub const fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// Relative pricing bucket for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingTier {
    /// No cost (local models)
    Free,
    /// Low-cost hosted models
    Budget,
    /// Mid-range hosted models
    Standard,
    /// Frontier hosted models
    Premium,
}

/// What a model can do
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Accepts image input
    pub supports_vision: bool,
    /// Supports tool/function calling
    pub supports_tools: bool,
    /// Supports streaming responses
    pub supports_streaming: bool,
    /// Context window size in tokens
    pub context_window: u32,
    /// Maximum output tokens, when the backend documents one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Catalog entry for an available model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier used in requests
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Owning provider id
    pub provider: String,
    /// Capability flags
    pub capabilities: ModelCapabilities,
    /// Pricing bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_tier: Option<PricingTier>,
}

/// Outcome of a credential validation check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the credentials were accepted
    pub valid: bool,
    /// Backend-specific explanation when invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    /// Credentials accepted
    pub const fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    /// Credentials rejected with an explanation
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_defaults_to_true() {
        let request: CompletionRequest = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "hi"}],
        }))
        .expect("valid request");

        assert!(request.stream);
        assert_eq!(request.messages[0].role, Role::User);
    }

    #[test]
    fn terminal_chunk_is_terminal() {
        let chunk = CompletionChunk::terminal("m1", FinishReason::Stop, None);
        assert!(chunk.is_terminal());
        assert!(!CompletionChunk::text("m1", "hi").is_terminal());
    }

    #[test]
    fn chunk_serializes_without_empty_fields() {
        let value = serde_json::to_value(CompletionChunk::text("m1", "hi")).expect("serializable");
        assert_eq!(value, serde_json::json!({"id": "m1", "content": "hi"}));
    }
}
