//! Conversion between domain types and the Ollama wire format
//!
//! Ollama models emit reasoning inline as a `<think>…</think>` block at
//! the head of the response text; extraction happens once the full text
//! is known (stream end, or the single non-streaming body).

use std::sync::OnceLock;

use manifold_core::{CompletionChunk, CompletionRequest, FinishReason, Role, Usage};
use regex::Regex;

use crate::protocol::ollama::{OllamaChatChunk, OllamaChatRequest, OllamaMessage, OllamaOptions};

/// Content prefix marking reasoning text
const THINKING_PREFIX: &str = "[thinking] ";

/// Reasoning directive injected for qwen3-family models
const REASONING_DIRECTIVE: &str = "/think";

// -- Outbound: domain request -> Ollama wire request --

impl From<&CompletionRequest> for OllamaChatRequest {
    fn from(req: &CompletionRequest) -> Self {
        let messages = req
            .messages
            .iter()
            .map(|msg| OllamaMessage {
                role: match msg.role {
                    Role::System => "system".to_owned(),
                    Role::User => "user".to_owned(),
                    Role::Assistant => "assistant".to_owned(),
                    Role::Tool => "tool".to_owned(),
                },
                content: msg.content.clone(),
            })
            .collect();

        let options = if req.temperature.is_some() || req.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: req.temperature,
                num_predict: req.max_tokens,
            })
        } else {
            None
        };

        Self {
            model: req.model.clone(),
            messages,
            stream: req.stream,
            options,
        }
    }
}

/// Inject the `/think` reasoning directive for qwen3-family models
///
/// This is a request-shaping rule scoped to exactly one model family;
/// other models are left untouched.
pub fn apply_reasoning_directive(request: &mut OllamaChatRequest) {
    if !request.model.starts_with("qwen3") {
        return;
    }

    if let Some(system) = request.messages.iter_mut().find(|m| m.role == "system") {
        if !system.content.contains(REASONING_DIRECTIVE) {
            system.content.push(' ');
            system.content.push_str(REASONING_DIRECTIVE);
        }
    } else {
        request.messages.insert(
            0,
            OllamaMessage {
                role: "system".to_owned(),
                content: REASONING_DIRECTIVE.to_owned(),
            },
        );
    }
}

// -- Thinking extraction --

/// Result of splitting a response into reasoning and answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkingSplit {
    /// Text inside the `<think>` block (empty when absent)
    pub thinking: String,
    /// Answer text outside the block
    pub response: String,
    /// Whether a `<think>` block was present
    pub has_thinking: bool,
}

fn thinking_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("valid thinking regex"))
}

/// Split a completed response into its thinking block and answer
pub fn split_thinking(text: &str) -> ThinkingSplit {
    thinking_regex().captures(text).map_or_else(
        || ThinkingSplit {
            thinking: String::new(),
            response: text.to_owned(),
            has_thinking: false,
        },
        |captures| {
            let full = captures.get(0).map_or("", |m| m.as_str());
            ThinkingSplit {
                thinking: captures.get(1).map_or("", |m| m.as_str()).trim().to_owned(),
                response: text.replacen(full, "", 1).trim().to_owned(),
                has_thinking: true,
            }
        },
    )
}

/// Reformat a completed response when it carries a thinking block
///
/// Returns `None` when there is nothing to reformat.
pub fn reformat_thinking(text: &str) -> Option<String> {
    let split = split_thinking(text);
    split
        .has_thinking
        .then(|| format!("{THINKING_PREFIX}{}\n\n{}", split.thinking, split.response))
}

// -- Inbound: Ollama wire response -> domain chunks --

/// Collapse a non-streaming chat body into its single terminal chunk
pub fn response_to_chunk(body: &OllamaChatChunk, id: String) -> CompletionChunk {
    let raw = body.message.as_ref().map_or("", |m| m.content.as_str());
    let content = reformat_thinking(raw).unwrap_or_else(|| raw.to_owned());

    CompletionChunk {
        id,
        content: Some(content),
        tool_calls: None,
        finish_reason: Some(FinishReason::Stop),
        usage: Some(usage_from(body)),
    }
}

fn usage_from(chunk: &OllamaChatChunk) -> Usage {
    Usage {
        prompt_tokens: chunk.prompt_eval_count.unwrap_or(0),
        completion_tokens: chunk.eval_count.unwrap_or(0),
    }
}

/// State tracker for normalizing an Ollama NDJSON stream
///
/// Fragments are forwarded as they arrive and appended to a running
/// total; the `done: true` line carries the only meaningful usage
/// counters and produces the terminal chunk. When the accumulated text
/// contains a thinking block, the terminal chunk carries the full
/// reformatted text so consumers can replace their incremental buffer.
#[derive(Debug)]
pub struct OllamaStreamState {
    id: String,
    total: String,
    done: bool,
}

impl OllamaStreamState {
    /// Create a fresh stream state with a synthesized stream id
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            total: String::new(),
            done: false,
        }
    }

    /// Normalize one decoded NDJSON line
    pub fn apply(&mut self, line: &OllamaChatChunk) -> Vec<CompletionChunk> {
        let mut out = Vec::new();

        if let Some(message) = &line.message
            && !message.content.is_empty()
        {
            self.total.push_str(&message.content);
            if !line.done {
                out.push(CompletionChunk::text(self.id.clone(), message.content.clone()));
            }
        }

        if line.done {
            self.done = true;
            let mut terminal = CompletionChunk::terminal(self.id.clone(), FinishReason::Stop, Some(usage_from(line)));
            terminal.content = reformat_thinking(&self.total);
            out.push(terminal);
        }

        out
    }

    /// Close out a stream that ended without a `done: true` line
    ///
    /// Usage counters only travel on the done line, so a synthesized
    /// terminal carries none.
    pub fn finish(&mut self) -> CompletionChunk {
        self.done = true;
        let mut terminal = CompletionChunk::terminal(self.id.clone(), FinishReason::Stop, None);
        terminal.content = reformat_thinking(&self.total);
        terminal
    }

    /// Whether the `done: true` line has been observed
    pub const fn is_done(&self) -> bool {
        self.done
    }
}

impl Default for OllamaStreamState {
    fn default() -> Self {
        Self::new()
    }
}
