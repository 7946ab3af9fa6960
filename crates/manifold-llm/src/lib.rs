//! Unified completion protocol over multiple LLM backends
//!
//! Provides one request/chunk contract over three wire protocols
//! (`OpenAI`-style SSE, Anthropic typed SSE, Ollama NDJSON), with
//! jittered retry, per-model admission control, and a provider
//! registry.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod decode;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod retry;

pub use manifold_core::{
    CompletionChunk, CompletionRequest, FinishReason, Message, Model, ProviderError,
    ProviderErrorKind, Role, ToolCall, Usage,
};
pub use provider::{
    ChatProvider, ChunkStream, anthropic::AnthropicProvider, ollama::OllamaProvider,
    openai::OpenAiProvider,
};
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;
