//! Ollama local provider implementation
//!
//! Ollama needs no credentials; the catalog is discovered from the local
//! daemon and cached briefly. Model lifecycle operations (pull, delete,
//! show) are backend-specific extensions outside the common contract.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use manifold_core::{
    CompletionChunk, CompletionRequest, Model, ModelCapabilities, PricingTier, ProviderError,
    ProviderSettings, ValidationResult,
};
use reqwest::Client;
use secrecy::SecretString;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{ChatProvider, ChunkStream};
use crate::convert::ollama::{apply_reasoning_directive, response_to_chunk};
use crate::decode::NdjsonDecoder;
use crate::error::{ollama_error, ollama_transport_error};
use crate::protocol::ollama::{
    OllamaChatChunk, OllamaChatRequest, OllamaDeleteRequest, OllamaModelEntry, OllamaPullProgress,
    OllamaPullRequest, OllamaShowRequest, OllamaShowResponse, OllamaTagsResponse,
};
use crate::retry::{RetryPolicy, with_retry};

/// Default Ollama daemon URL
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default connect timeout when settings carry none
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a discovered catalog stays fresh
const CATALOG_TTL: Duration = Duration::from_secs(60);

struct CachedCatalog {
    models: Vec<Model>,
    fetched_at: Instant,
}

/// Ollama local provider
pub struct OllamaProvider {
    client: Client,
    base_url: Url,
    enabled: bool,
    retry: RetryPolicy,
    catalog: Mutex<Option<CachedCatalog>>,
}

impl OllamaProvider {
    /// Create from provider settings
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never happen).
    pub fn new(settings: ProviderSettings) -> Self {
        let base_url = settings
            .base_url
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        let connect_timeout = settings
            .timeout_secs
            .map_or(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs);

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                Client::new()
            });

        Self {
            client,
            base_url,
            enabled: settings.enabled,
            retry: RetryPolicy::default(),
            catalog: Mutex::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }

    /// Issue the chat request and check the status, without consuming the body
    async fn send_chat(&self, wire: &OllamaChatRequest) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(self.endpoint("/api/chat"))
            .json(wire)
            .send()
            .await
            .map_err(|e| ollama_transport_error(&e, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ollama_error(status, &body));
        }
        Ok(response)
    }

    async fn fetch_tags(&self) -> Result<OllamaTagsResponse, ProviderError> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(|e| ollama_transport_error(&e, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ollama_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ollama_transport_error(&e, &self.base_url))
    }

    /// Drop the cached catalog so the next listing re-discovers
    pub async fn invalidate_catalog(&self) {
        *self.catalog.lock().await = None;
    }

    // -- Lifecycle extensions --

    /// Download a model, reporting NDJSON progress lines to `progress`
    pub async fn pull_model<F>(&self, name: &str, mut progress: F) -> Result<(), ProviderError>
    where
        F: FnMut(&OllamaPullProgress) + Send,
    {
        use futures_util::StreamExt;

        let wire = OllamaPullRequest {
            name: name.to_owned(),
            stream: true,
        };
        let response = self
            .client
            .post(self.endpoint("/api/pull"))
            .json(&wire)
            .send()
            .await
            .map_err(|e| ollama_transport_error(&e, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ollama_error(status, &body));
        }

        let mut decoder = NdjsonDecoder::<OllamaPullProgress>::new();
        let mut bytes = response.bytes_stream();
        while let Some(block) = bytes.next().await {
            let block = block.map_err(|e| ollama_transport_error(&e, &self.base_url))?;
            for line in decoder.feed(&block) {
                progress(&line);
            }
        }
        if let Some(line) = decoder.finish() {
            progress(&line);
        }

        self.invalidate_catalog().await;
        Ok(())
    }

    /// Remove a local model
    pub async fn delete_model(&self, name: &str) -> Result<(), ProviderError> {
        let wire = OllamaDeleteRequest { name: name.to_owned() };
        let response = self
            .client
            .delete(self.endpoint("/api/delete"))
            .json(&wire)
            .send()
            .await
            .map_err(|e| ollama_transport_error(&e, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ollama_error(status, &body));
        }

        self.invalidate_catalog().await;
        Ok(())
    }

    /// Inspect a local model's modelfile, parameters, and metadata
    pub async fn model_details(&self, name: &str) -> Result<OllamaShowResponse, ProviderError> {
        let wire = OllamaShowRequest { name: name.to_owned() };
        let response = self
            .client
            .post(self.endpoint("/api/show"))
            .json(&wire)
            .send()
            .await
            .map_err(|e| ollama_transport_error(&e, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ollama_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ollama_transport_error(&e, &self.base_url))
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_api_key(&self, _key: SecretString) {}

    fn clear_api_key(&self) {}

    async fn validate_credentials(&self, _key: &SecretString) -> Result<ValidationResult, ProviderError> {
        // No credentials to check; validation means the daemon answers.
        match self.fetch_tags().await {
            Ok(_) => Ok(ValidationResult::ok()),
            Err(e) => Ok(ValidationResult::rejected(e.message)),
        }
    }

    async fn list_models(&self) -> Result<Vec<Model>, ProviderError> {
        let mut cache = self.catalog.lock().await;
        if let Some(cached) = cache.as_ref()
            && cached.fetched_at.elapsed() < CATALOG_TTL
        {
            return Ok(cached.models.clone());
        }

        let tags = self.fetch_tags().await?;
        let models: Vec<Model> = tags.models.iter().map(entry_to_model).collect();
        *cache = Some(CachedCatalog {
            models: models.clone(),
            fetched_at: Instant::now(),
        });
        Ok(models)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionChunk, ProviderError> {
        let mut wire: OllamaChatRequest = request.into();
        wire.stream = false;
        apply_reasoning_directive(&mut wire);

        let response = with_retry(self.retry, self.id(), || self.send_chat(&wire)).await?;
        let body: OllamaChatChunk = response
            .json()
            .await
            .map_err(|e| ollama_transport_error(&e, &self.base_url))?;

        Ok(response_to_chunk(&body, uuid::Uuid::new_v4().to_string()))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream, ProviderError> {
        let mut wire: OllamaChatRequest = request.into();
        wire.stream = true;
        apply_reasoning_directive(&mut wire);

        let response = with_retry(self.retry, self.id(), || self.send_chat(&wire)).await?;
        let bytes = response.bytes_stream();

        Ok(super::ollama_chunk_stream(bytes, cancel))
    }
}

fn entry_to_model(entry: &OllamaModelEntry) -> Model {
    let family = entry
        .details
        .as_ref()
        .and_then(|d| d.family.as_deref())
        .unwrap_or_default();

    Model {
        id: entry.name.clone(),
        name: entry.name.clone(),
        provider: "ollama".to_owned(),
        capabilities: ModelCapabilities {
            supports_vision: matches!(family, "clip" | "mllama" | "llava"),
            supports_tools: true,
            supports_streaming: true,
            context_window: 8_192,
            max_output_tokens: None,
        },
        pricing_tier: Some(PricingTier::Free),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_against_base() {
        let provider = OllamaProvider::new(ProviderSettings::default());
        assert_eq!(provider.endpoint("/api/chat"), "http://localhost:11434/api/chat");
        assert_eq!(provider.endpoint("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn needs_no_key_and_is_always_configured() {
        let provider = OllamaProvider::new(ProviderSettings::default());
        assert!(!provider.requires_api_key());
        assert!(provider.is_configured());
    }

    #[test]
    fn discovered_entries_are_free_local_models() {
        let entry: OllamaModelEntry = serde_json::from_value(serde_json::json!({
            "name": "llama3.2:3b",
            "size": 2_000_000_000_u64,
            "details": {"family": "llama", "parameter_size": "3B"},
        }))
        .expect("valid entry");

        let model = entry_to_model(&entry);
        assert_eq!(model.provider, "ollama");
        assert_eq!(model.pricing_tier, Some(PricingTier::Free));
        assert!(!model.capabilities.supports_vision);
    }
}
