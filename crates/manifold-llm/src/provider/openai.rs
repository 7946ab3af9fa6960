//! OpenAI-compatible provider implementation

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use manifold_core::{
    CompletionChunk, CompletionRequest, Model, ModelCapabilities, PricingTier, ProviderError,
    ProviderSettings, ValidationResult,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{ApiKeyStore, ChatProvider, ChunkStream};
use crate::convert::openai::response_to_chunk;
use crate::error::{openai_error, transport_error};
use crate::protocol::openai::{OpenAiModelList, OpenAiRequest, OpenAiResponse};
use crate::retry::{RetryPolicy, with_retry};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    client: Client,
    base_url: Url,
    api_key: ApiKeyStore,
    enabled: bool,
    retry: RetryPolicy,
}

impl OpenAiProvider {
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
        }
    }

    /// Build the chat completions URL
    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    /// Build the model listing URL
    fn models_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/models")
    }

    /// Issue the request and check the status, without consuming the body
    async fn send(&self, wire: &OpenAiRequest) -> Result<reqwest::Response, ProviderError> {
        let key = self.api_key.get(self.id())?;

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(key.expose_secret())
            .json(wire)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.id()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(openai_error(status, &body, self.id()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn name(&self) -> &str {
        "OpenAI"
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
            .bearer_auth(key.expose_secret())
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
        Err(openai_error(status, &response.text().await.unwrap_or_default(), self.id()))
    }

    async fn list_models(&self) -> Result<Vec<Model>, ProviderError> {
        // The /models endpoint lists fine-tunes and embeddings too, so
        // filter to the chat models in the static catalog.
        let key = self.api_key.get(self.id())?;
        let response = self
            .client
            .get(self.models_url())
            .bearer_auth(key.expose_secret())
            .send()
            .await
            .map_err(|e| transport_error(&e, self.id()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(openai_error(status, &body, self.id()));
        }

        let listing: OpenAiModelList = response
            .json()
            .await
            .map_err(|e| transport_error(&e, self.id()))?;

        let catalog = chat_model_catalog();
        let available: Vec<Model> = catalog
            .iter()
            .filter(|model| listing.data.iter().any(|entry| entry.id == model.id))
            .cloned()
            .collect();

        // A compatible third-party endpoint may list none of the
        // canonical ids; fall back to the full catalog.
        if available.is_empty() {
            return Ok(catalog);
        }
        Ok(available)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionChunk, ProviderError> {
        let mut wire: OpenAiRequest = request.into();
        wire.stream = Some(false);
        wire.stream_options = None;

        let response = with_retry(self.retry, self.id(), || self.send(&wire)).await?;
        let body: OpenAiResponse = response
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
        let mut wire: OpenAiRequest = request.into();
        wire.stream = Some(true);

        let response = with_retry(self.retry, self.id(), || self.send(&wire)).await?;
        let events = response.bytes_stream().eventsource();

        Ok(super::openai_chunk_stream(events, self.id().to_owned(), cancel))
    }
}

/// Chat models served through the canonical API
fn chat_model_catalog() -> Vec<Model> {
    vec![
        Model {
            id: "gpt-4o".to_owned(),
            name: "GPT-4o".to_owned(),
            provider: "openai".to_owned(),
            capabilities: ModelCapabilities {
                supports_vision: true,
                supports_tools: true,
                supports_streaming: true,
                context_window: 128_000,
                max_output_tokens: Some(16_384),
            },
            pricing_tier: Some(PricingTier::Standard),
        },
        Model {
            id: "gpt-4o-mini".to_owned(),
            name: "GPT-4o mini".to_owned(),
            provider: "openai".to_owned(),
            capabilities: ModelCapabilities {
                supports_vision: true,
                supports_tools: true,
                supports_streaming: true,
                context_window: 128_000,
                max_output_tokens: Some(16_384),
            },
            pricing_tier: Some(PricingTier::Budget),
        },
        Model {
            id: "o3-mini".to_owned(),
            name: "o3-mini".to_owned(),
            provider: "openai".to_owned(),
            capabilities: ModelCapabilities {
                supports_vision: false,
                supports_tools: true,
                supports_streaming: true,
                context_window: 200_000,
                max_output_tokens: Some(100_000),
            },
            pricing_tier: Some(PricingTier::Standard),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(ProviderSettings::default())
    }

    #[test]
    fn urls_tolerate_trailing_slash() {
        let provider = OpenAiProvider::new(ProviderSettings {
            base_url: Some(Url::parse("https://nim.example.com/v1/").expect("valid url")),
            ..ProviderSettings::default()
        });

        assert_eq!(provider.completions_url(), "https://nim.example.com/v1/chat/completions");
        assert_eq!(provider.models_url(), "https://nim.example.com/v1/models");
    }

    #[test]
    fn configured_tracks_key_lifecycle() {
        let provider = provider();
        assert!(!provider.is_configured());

        provider.set_api_key(SecretString::from("sk-test"));
        assert!(provider.is_configured());

        provider.clear_api_key();
        assert!(!provider.is_configured());
    }

    #[test]
    fn catalog_models_belong_to_provider() {
        assert!(chat_model_catalog().iter().all(|m| m.provider == "openai"));
    }
}
