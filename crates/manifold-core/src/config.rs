//! Provider configuration types

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// Input configuration for a single provider
///
/// API keys are wrapped in [`SecretString`] so they never appear in
/// debug output or logs.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderSettings {
    /// API key, when the backend requires one
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Whether the provider may serve requests
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Per-request connect timeout in seconds (Ollama)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

const fn default_enabled() -> bool {
    true
}

/// Read-only projection of provider state for registry consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Whether the backend needs an API key at all
    pub api_key_required: bool,
    /// Whether credentials are currently present
    pub is_configured: bool,
    /// Whether the provider may serve requests
    pub is_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_to_enabled() {
        let settings: ProviderSettings = serde_json::from_value(serde_json::json!({})).expect("valid settings");
        assert!(settings.enabled);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn api_key_is_not_debug_printed() {
        let settings: ProviderSettings =
            serde_json::from_value(serde_json::json!({"api_key": "sk-secret"})).expect("valid settings");
        let printed = format!("{settings:?}");
        assert!(!printed.contains("sk-secret"));
    }
}
