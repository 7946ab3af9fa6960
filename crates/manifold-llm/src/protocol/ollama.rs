//! Ollama chat API wire format types
//!
//! Ollama streams newline-delimited JSON: one self-contained document
//! per line, terminated by a line with `done: true`. Usage counters are
//! only meaningful on that final line.

use serde::{Deserialize, Serialize};

// -- Chat --

/// Ollama chat request (`POST /api/chat`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaChatRequest {
    /// Model name (e.g. "llama3.2:3b")
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OllamaMessage>,
    /// Whether to stream NDJSON (false returns one JSON document)
    pub stream: bool,
    /// Generation options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Message in an Ollama chat request or response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// Message role
    pub role: String,
    /// Text content
    pub content: String,
}

/// Generation options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaOptions {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// One NDJSON line of a chat stream, or the whole non-streaming body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaChatChunk {
    /// Model that produced this chunk
    #[serde(default)]
    pub model: String,
    /// Incremental (or, non-streaming, complete) message
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    /// Whether this is the terminal line
    #[serde(default)]
    pub done: bool,
    /// Prompt token count (terminal line only)
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    /// Completion token count (terminal line only)
    #[serde(default)]
    pub eval_count: Option<u32>,
}

// -- Model catalog --

/// Model catalog response (`GET /api/tags`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaTagsResponse {
    /// Installed models
    #[serde(default)]
    pub models: Vec<OllamaModelEntry>,
}

/// One installed model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaModelEntry {
    /// Model name including tag
    pub name: String,
    /// On-disk size in bytes
    #[serde(default)]
    pub size: Option<u64>,
    /// Model metadata
    #[serde(default)]
    pub details: Option<OllamaModelDetails>,
}

/// Model metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaModelDetails {
    /// Model family (e.g. "llama", "qwen3")
    #[serde(default)]
    pub family: Option<String>,
    /// Parameter count label (e.g. "8B")
    #[serde(default)]
    pub parameter_size: Option<String>,
    /// Quantization label (e.g. "Q4_K_M")
    #[serde(default)]
    pub quantization_level: Option<String>,
}

// -- Model lifecycle --

/// Pull request (`POST /api/pull`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaPullRequest {
    /// Model name to download
    pub name: String,
    /// Stream NDJSON progress lines
    pub stream: bool,
}

/// One NDJSON progress line of a pull
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaPullProgress {
    /// Human-readable phase (e.g. "pulling manifest")
    pub status: String,
    /// Bytes completed for the current layer
    #[serde(default)]
    pub completed: Option<u64>,
    /// Total bytes for the current layer
    #[serde(default)]
    pub total: Option<u64>,
}

/// Delete request (`DELETE /api/delete`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaDeleteRequest {
    /// Model name to remove
    pub name: String,
}

/// Show request (`POST /api/show`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaShowRequest {
    /// Model name to inspect
    pub name: String,
}

/// Show response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaShowResponse {
    /// Modelfile contents
    #[serde(default)]
    pub modelfile: Option<String>,
    /// Runtime parameters
    #[serde(default)]
    pub parameters: Option<String>,
    /// Prompt template
    #[serde(default)]
    pub template: Option<String>,
    /// Model metadata
    #[serde(default)]
    pub details: Option<OllamaModelDetails>,
}

// -- Error response --

/// Ollama error body (`{"error": "..."}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaErrorResponse {
    /// Error message
    pub error: String,
}
