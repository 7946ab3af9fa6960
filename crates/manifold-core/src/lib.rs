//! Domain types shared by every manifold provider backend
//!
//! Everything a caller sees (requests, chunks, models, the error
//! taxonomy) lives here. Wire formats stay inside `manifold-llm`.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ProviderConfig, ProviderSettings};
pub use error::{ProviderError, ProviderErrorKind};
pub use types::{
    CompletionChunk, CompletionRequest, FinishReason, Message, Model, ModelCapabilities, PricingTier, Role,
    ToolCall, ToolDefinition, Usage, ValidationResult,
};
