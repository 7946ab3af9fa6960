//! Process-wide provider directory
//!
//! The registry maps provider ids to their implementations plus the
//! mutable bookkeeping collaborators need (configured flag, cached
//! model listings). It holds no network state itself; construct one at
//! application start and inject it by reference.

use std::sync::Arc;

use dashmap::DashMap;
use manifold_core::{Model, ProviderConfig};

use crate::provider::ChatProvider;

/// One registered provider with its bookkeeping
struct RegistryEntry {
    provider: Arc<dyn ChatProvider>,
    is_configured: bool,
    cached_models: Option<Vec<Model>>,
}

/// Directory of registered providers, keyed by provider id
#[derive(Default)]
pub struct ProviderRegistry {
    entries: DashMap<String, RegistryEntry>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous entry under its id
    pub fn register(&self, provider: Arc<dyn ChatProvider>) {
        let is_configured = provider.is_configured();
        self.entries.insert(
            provider.id().to_owned(),
            RegistryEntry {
                provider,
                is_configured,
                cached_models: None,
            },
        );
    }

    /// Look up a provider by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn ChatProvider>> {
        self.entries.get(id).map(|entry| Arc::clone(&entry.provider))
    }

    /// Project every registered provider into its read-only config view
    pub fn list(&self) -> Vec<ProviderConfig> {
        self.entries
            .iter()
            .map(|entry| ProviderConfig {
                id: entry.provider.id().to_owned(),
                name: entry.provider.name().to_owned(),
                api_key_required: entry.provider.requires_api_key(),
                is_configured: entry.is_configured,
                is_enabled: entry.provider.is_enabled(),
            })
            .collect()
    }

    /// Mark a provider as configured or not (e.g. after key changes)
    pub fn set_configured(&self, id: &str, configured: bool) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            entry.is_configured = configured;
        }
    }

    /// Store a model listing for later [`cached_models`](Self::cached_models) calls
    pub fn cache_models(&self, id: &str, models: Vec<Model>) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            entry.cached_models = Some(models);
        }
    }

    /// Retrieve a previously cached model listing
    pub fn cached_models(&self, id: &str) -> Option<Vec<Model>> {
        self.entries.get(id).and_then(|entry| entry.cached_models.clone())
    }

    /// Remove every entry (test teardown / reconfiguration)
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use manifold_core::{
        CompletionChunk, CompletionRequest, FinishReason, ProviderError, ValidationResult,
    };
    use secrecy::SecretString;
    use tokio_util::sync::CancellationToken;

    use crate::provider::ChunkStream;

    struct FakeProvider {
        id: &'static str,
    }

    #[async_trait]
    impl ChatProvider for FakeProvider {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            "Fake"
        }

        fn is_configured(&self) -> bool {
            false
        }

        fn set_api_key(&self, _key: SecretString) {}

        fn clear_api_key(&self) {}

        async fn validate_credentials(&self, _key: &SecretString) -> Result<ValidationResult, ProviderError> {
            Ok(ValidationResult::ok())
        }

        async fn list_models(&self) -> Result<Vec<Model>, ProviderError> {
            Ok(Vec::new())
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionChunk, ProviderError> {
            Ok(CompletionChunk::terminal("f1", FinishReason::Stop, None))
        }

        async fn complete_stream(
            &self,
            _request: &CompletionRequest,
            _cancel: CancellationToken,
        ) -> Result<ChunkStream, ProviderError> {
            Ok(Box::pin(futures_util::stream::empty()))
        }
    }

    #[test]
    fn register_get_and_list() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(FakeProvider { id: "fake" }));

        assert!(registry.get("fake").is_some());
        assert!(registry.get("missing").is_none());

        let listing = registry.list();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, "fake");
        assert!(!listing[0].is_configured);
    }

    #[test]
    fn configured_flag_is_mutable_per_entry() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(FakeProvider { id: "fake" }));

        registry.set_configured("fake", true);
        assert!(registry.list()[0].is_configured);

        // Unknown ids are ignored rather than created
        registry.set_configured("missing", true);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn model_cache_round_trips_and_clears() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(FakeProvider { id: "fake" }));

        assert!(registry.cached_models("fake").is_none());
        registry.cache_models("fake", Vec::new());
        assert!(registry.cached_models("fake").is_some_and(|models| models.is_empty()));

        registry.clear();
        assert!(registry.get("fake").is_none());
    }
}
