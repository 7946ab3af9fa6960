//! Anthropic Messages API provider implementation

use std::collections::HashMap;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use manifold_core::{
    CompletionChunk, CompletionRequest, Model, ModelCapabilities, PricingTier, ProviderError,
    ProviderErrorKind, ProviderSettings, ValidationResult,
};
use manifold_ratelimit::{ModelLimit, SlidingWindowLimiter};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{ApiKeyStore, ChatProvider, ChunkStream};
use crate::convert::anthropic::response_to_chunk;
use crate::error::{anthropic_error, transport_error};
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse};
use crate::retry::{RetryPolicy, with_retry};

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Messages API version header value
const API_VERSION: &str = "2023-06-01";

/// Beta flag enabling the 1M-token context window
const EXTENDED_CONTEXT_BETA: &str = "context-1m-2025-08-07";

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    client: Client,
    base_url: Url,
    api_key: ApiKeyStore,
    enabled: bool,
    retry: RetryPolicy,
    limiter: SlidingWindowLimiter,
}

impl AnthropicProvider {
    /// Create from provider settings
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never happen).
    pub fn new(settings: ProviderSettings) -> Self {
        let base_url = settings
            .base_url
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Self {
            client: Client::new(),
            base_url,
            api_key: ApiKeyStore::new(settings.api_key),
            enabled: settings.enabled,
            retry: RetryPolicy::default(),
            limiter: SlidingWindowLimiter::new(request_budgets(), None),
        }
    }

    /// Build the messages URL
    fn messages_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/messages")
    }

    /// Build the model listing URL
    fn models_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/models")
    }

    /// Admission check against the per-model window, before any network I/O
    fn admit(&self, model: &str) -> Result<(), ProviderError> {
        self.limiter.check(model).map_err(|e| {
            ProviderError::new(
                format!("rate limit reached for {model}, retry in {}s", e.retry_after()),
                ProviderErrorKind::RateLimit,
                self.id(),
            )
        })
    }

    /// Issue the request and check the status, without consuming the body
    async fn send(&self, wire: &AnthropicRequest) -> Result<reqwest::Response, ProviderError> {
        let key = self.api_key.get(self.id())?;

        let mut builder = self
            .client
            .post(self.messages_url())
            .header("x-api-key", key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(wire);

        if needs_extended_context(&wire.model) {
            builder = builder.header("anthropic-beta", EXTENDED_CONTEXT_BETA);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&e, self.id()))?;

        // The request reached the backend, so it consumes admission
        // budget whether or not it succeeded.
        self.limiter.record(&wire.model);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anthropic_error(status, &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    fn name(&self) -> &str {
        "Anthropic"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_set()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_api_key(&self, key: SecretString) {
        self.api_key.set(key);
    }

    fn clear_api_key(&self) {
        self.api_key.clear();
    }

    async fn validate_credentials(&self, key: &SecretString) -> Result<ValidationResult, ProviderError> {
        let response = self
            .client
            .get(self.models_url())
            .header("x-api-key", key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.id()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(ValidationResult::ok());
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(ValidationResult::rejected("API key rejected"));
        }
        Err(anthropic_error(status, &response.text().await.unwrap_or_default()))
    }

    async fn list_models(&self) -> Result<Vec<Model>, ProviderError> {
        Ok(model_catalog())
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionChunk, ProviderError> {
        let mut wire: AnthropicRequest = request.into();
        wire.model = resolve_alias(&wire.model).to_owned();
        wire.stream = Some(false);

        self.admit(&wire.model)?;

        let response = with_retry(self.retry, self.id(), || self.send(&wire)).await?;
        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| transport_error(&e, self.id()))?;

        Ok(response_to_chunk(body))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ProviderError> {
        let mut wire: AnthropicRequest = request.into();
        wire.model = resolve_alias(&wire.model).to_owned();
        wire.stream = Some(true);

        self.admit(&wire.model)?;

        let response = with_retry(self.retry, self.id(), || self.send(&wire)).await?;
        let events = response.bytes_stream().eventsource();

        Ok(super::anthropic_chunk_stream(events, cancel))
    }
}

// -- Catalog --

/// Resolve a bare model alias to its dated id
///
/// Requests may name a model without a snapshot date; the wire always
/// carries the dated id. Unknown names pass through unchanged.
pub fn resolve_alias(model: &str) -> &str {
    match model {
        "claude-opus-4" => "claude-opus-4-20250514",
        "claude-sonnet-4" => "claude-sonnet-4-20250514",
        "claude-3-5-haiku" => "claude-3-5-haiku-20241022",
        other => other,
    }
}

fn needs_extended_context(model: &str) -> bool {
    model.starts_with("claude-sonnet-4")
}

/// Per-model request budgets for the admission window
fn request_budgets() -> HashMap<String, ModelLimit> {
    model_catalog()
        .into_iter()
        .map(|model| {
            let rpm = match model.pricing_tier {
                Some(PricingTier::Premium) => 20,
                _ => 50,
            };
            (model.id, ModelLimit { requests_per_minute: rpm })
        })
        .collect()
}

fn model_catalog() -> Vec<Model> {
    vec![
        Model {
            id: "claude-opus-4-20250514".to_owned(),
            name: "Claude Opus 4".to_owned(),
            provider: "anthropic".to_owned(),
            capabilities: ModelCapabilities {
                supports_vision: true,
                supports_tools: true,
                supports_streaming: true,
                context_window: 200_000,
                max_output_tokens: Some(32_000),
            },
            pricing_tier: Some(PricingTier::Premium),
        },
        Model {
            id: "claude-sonnet-4-20250514".to_owned(),
            name: "Claude Sonnet 4".to_owned(),
            provider: "anthropic".to_owned(),
            capabilities: ModelCapabilities {
                supports_vision: true,
                supports_tools: true,
                supports_streaming: true,
                context_window: 1_000_000,
                max_output_tokens: Some(64_000),
            },
            pricing_tier: Some(PricingTier::Standard),
        },
        Model {
            id: "claude-3-5-haiku-20241022".to_owned(),
            name: "Claude 3.5 Haiku".to_owned(),
            provider: "anthropic".to_owned(),
            capabilities: ModelCapabilities {
                supports_vision: true,
                supports_tools: true,
                supports_streaming: true,
                context_window: 200_000,
                max_output_tokens: Some(8_192),
            },
            pricing_tier: Some(PricingTier::Budget),
        },
    ]
}

#[cfg(test)]
mod tests {
    use manifold_core::{Message, Role};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn aliases_resolve_to_dated_ids() {
        assert_eq!(resolve_alias("claude-sonnet-4"), "claude-sonnet-4-20250514");
        assert_eq!(resolve_alias("claude-sonnet-4-20250514"), "claude-sonnet-4-20250514");
        assert_eq!(resolve_alias("claude-unknown"), "claude-unknown");
    }

    #[test]
    fn every_catalog_model_has_a_request_budget() {
        let budgets = request_budgets();
        for model in model_catalog() {
            assert!(budgets.contains_key(&model.id), "missing budget for {}", model.id);
        }
    }

    #[tokio::test]
    async fn failed_requests_consume_admission_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such model"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(ProviderSettings {
            api_key: Some(SecretString::from("sk-test")),
            base_url: Some(Url::parse(&server.uri()).expect("valid mock url")),
            ..ProviderSettings::default()
        });
        let request = CompletionRequest::new("claude-opus-4", vec![Message::new(Role::User, "hi")]);

        // Premium budget is 20 requests per window; every 404 counts
        for _ in 0..20 {
            let err = provider.complete(&request).await.expect_err("backend rejects");
            assert_eq!(err.kind, ProviderErrorKind::NotFound);
        }

        let err = provider.complete(&request).await.expect_err("window exhausted");
        assert_eq!(err.kind, ProviderErrorKind::RateLimit);
        assert_eq!(server.received_requests().await.map_or(0, |r| r.len()), 20);
    }

    #[test]
    fn admission_rejection_is_a_rate_limit_error() {
        let provider = AnthropicProvider::new(ProviderSettings::default());
        let model = "claude-3-5-haiku-20241022";

        for _ in 0..50 {
            provider.limiter.record(model);
        }

        let err = provider.admit(model).expect_err("budget exhausted");
        assert_eq!(err.kind, ProviderErrorKind::RateLimit);
        assert!(err.message.contains("retry in"));
    }
}
