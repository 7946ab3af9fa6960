//! Chunk normalization: backend wire events → domain [`CompletionChunk`]s
//!
//! Each backend gets a stateful normalizer that enforces the stream
//! invariant: exactly one terminal chunk per stream, carrying the finish
//! reason and usage, emitted last.
//!
//! [`CompletionChunk`]: manifold_core::CompletionChunk

pub mod anthropic;
pub mod ollama;
pub mod openai;
