//! Provider trait and implementations for LLM backends

pub mod anthropic;
pub mod ollama;
pub mod openai;

use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use async_stream::try_stream;
use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError};
use futures_util::{Stream, StreamExt};
use manifold_core::{
    CompletionChunk, CompletionRequest, Model, ProviderError, ProviderErrorKind, ValidationResult,
};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::convert::{
    anthropic::AnthropicStreamState, ollama::OllamaStreamState, openai::OpenAiStreamState,
};
use crate::decode::NdjsonDecoder;
use crate::protocol::{
    anthropic::AnthropicStreamEvent, ollama::OllamaChatChunk, openai::OpenAiStreamChunk,
};

/// Sentinel data payload terminating an OpenAI-style SSE stream
const DONE_SENTINEL: &str = "[DONE]";

/// Boxed stream of normalized completion chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk, ProviderError>> + Send>>;

/// Trait implemented by each chat backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stable provider identifier (e.g. "openai")
    fn id(&self) -> &str;

    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Whether requests require an API key
    fn requires_api_key(&self) -> bool {
        true
    }

    /// Whether the provider currently holds the credentials it requires
    fn is_configured(&self) -> bool;

    /// Whether the provider is enabled
    fn is_enabled(&self) -> bool {
        true
    }

    /// Install or replace the API key
    fn set_api_key(&self, key: SecretString);

    /// Remove the API key
    fn clear_api_key(&self);

    /// Check a candidate API key against the backend
    ///
    /// The key is not stored; call [`set_api_key`](Self::set_api_key)
    /// once it validates. Backends without keys check reachability.
    async fn validate_credentials(&self, key: &SecretString) -> Result<ValidationResult, ProviderError>;

    /// List the models this provider can serve
    async fn list_models(&self) -> Result<Vec<Model>, ProviderError>;

    /// Send a non-streaming completion request
    ///
    /// The entire response collapses into one terminal chunk.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionChunk, ProviderError>;

    /// Send a streaming completion request
    ///
    /// The stream yields exactly one terminal chunk, last, unless
    /// `cancel` fires first, in which case it ends without one.
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ProviderError>;
}

// -- Credential storage --

/// Interior-mutable holder for a provider's API key
#[derive(Debug, Default)]
pub(crate) struct ApiKeyStore {
    key: RwLock<Option<SecretString>>,
}

impl ApiKeyStore {
    pub fn new(key: Option<SecretString>) -> Self {
        Self { key: RwLock::new(key) }
    }

    pub fn set(&self, key: SecretString) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    pub fn clear(&self) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_set(&self) -> bool {
        self.key.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Clone out the key, or fail with an authentication error
    pub fn get(&self, provider: &str) -> Result<SecretString, ProviderError> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                ProviderError::new(
                    "no API key configured",
                    ProviderErrorKind::Authentication,
                    provider,
                )
            })
    }
}

// -- Stream assembly --

fn sse_transport_error<E: std::fmt::Display>(e: &EventStreamError<E>, provider: &str) -> ProviderError {
    ProviderError::new(
        format!("stream broken: {e}"),
        ProviderErrorKind::Connection,
        provider,
    )
}

/// Normalize an OpenAI-style SSE event stream into completion chunks
///
/// Errors on malformed frames are not fatal: the payload is skipped and
/// counted. The terminal chunk is synthesized after the `[DONE]`
/// sentinel (or stream end) from the latched finish reason and usage.
pub fn openai_chunk_stream<S, E>(events: S, provider: String, cancel: CancellationToken) -> ChunkStream
where
    S: Stream<Item = Result<Event, EventStreamError<E>>> + Send + 'static,
    E: std::fmt::Display + Send,
{
    Box::pin(try_stream! {
        let mut state = OpenAiStreamState::new();
        let mut events = std::pin::pin!(events);
        let mut cancelled = false;

        loop {
            // `?` must stay outside the select arms; try_stream cannot
            // rewrite it inside a nested macro invocation.
            let event = tokio::select! {
                () = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = events.next() => match next {
                    Some(Ok(event)) => Ok(event),
                    Some(Err(e)) => Err(sse_transport_error(&e, &provider)),
                    None => break,
                },
            }?;

            if event.data.trim() == DONE_SENTINEL {
                break;
            }
            match serde_json::from_str::<OpenAiStreamChunk>(&event.data) {
                Ok(frame) => {
                    for chunk in state.apply(&frame) {
                        yield chunk;
                    }
                }
                Err(e) => {
                    state.note_skipped();
                    debug!(provider = %provider, error = %e, "skipping malformed stream frame");
                }
            }
        }

        if !cancelled {
            if state.skipped_events() > 0 {
                debug!(provider = %provider, skipped = state.skipped_events(), "stream finished with skipped frames");
            }
            yield state.terminal();
        }
    })
}

/// Normalize an Anthropic typed SSE event stream into completion chunks
///
/// The terminal chunk comes from the `message_stop` event; an in-band
/// `error` event surfaces as a stream error and ends the stream.
pub fn anthropic_chunk_stream<S, E>(events: S, cancel: CancellationToken) -> ChunkStream
where
    S: Stream<Item = Result<Event, EventStreamError<E>>> + Send + 'static,
    E: std::fmt::Display + Send,
{
    Box::pin(try_stream! {
        let mut state = AnthropicStreamState::new("anthropic");
        let mut events = std::pin::pin!(events);

        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                next = events.next() => match next {
                    Some(Ok(event)) => Ok(event),
                    Some(Err(e)) => Err(sse_transport_error(&e, "anthropic")),
                    None => break,
                },
            }?;

            match serde_json::from_str::<AnthropicStreamEvent>(&event.data) {
                Ok(frame) => {
                    for chunk in state.apply(&frame)? {
                        yield chunk;
                    }
                    if state.is_done() {
                        break;
                    }
                }
                Err(e) => {
                    state.note_skipped();
                    debug!(provider = "anthropic", error = %e, "skipping malformed stream event");
                }
            }
        }

        // A dropped connection can end the stream before message_stop;
        // close out with what was latched so consumers still see a
        // terminal chunk.
        if !state.is_done() && !cancel.is_cancelled() {
            for chunk in state.apply(&AnthropicStreamEvent::MessageStop)? {
                yield chunk;
            }
        }
    })
}

/// Normalize an Ollama NDJSON byte stream into completion chunks
pub fn ollama_chunk_stream<S, B, E>(bytes: S, cancel: CancellationToken) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    Box::pin(try_stream! {
        let mut decoder = NdjsonDecoder::<OllamaChatChunk>::new();
        let mut state = OllamaStreamState::new();
        let mut bytes = std::pin::pin!(bytes);

        loop {
            let block = tokio::select! {
                () = cancel.cancelled() => break,
                next = bytes.next() => match next {
                    Some(Ok(block)) => Ok(block),
                    Some(Err(e)) => Err(ProviderError::new(
                        format!("stream broken: {e}"),
                        ProviderErrorKind::Connection,
                        "ollama",
                    )),
                    None => break,
                },
            }?;

            for line in decoder.feed(block.as_ref()) {
                for chunk in state.apply(&line) {
                    yield chunk;
                }
            }
            if state.is_done() {
                break;
            }
        }

        if !state.is_done() && !cancel.is_cancelled() {
            if let Some(line) = decoder.finish() {
                for chunk in state.apply(&line) {
                    yield chunk;
                }
            }
            // A truncated stream never delivered its done line; close
            // out so consumers still see a terminal chunk.
            if !state.is_done() {
                yield state.finish();
            }
        }
    })
}
