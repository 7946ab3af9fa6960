//! Mapping transport and HTTP failures into [`ProviderError`]
//!
//! Each backend reports failures in its own body shape; these helpers
//! parse what they can and fall back to the HTTP status when the body
//! is opaque.

use manifold_core::{ProviderError, ProviderErrorKind};
use reqwest::StatusCode;

use crate::{
    convert,
    protocol::{
        anthropic::AnthropicErrorResponse, ollama::OllamaErrorResponse,
        openai::OpenAiErrorResponse,
    },
};

/// Map a reqwest transport failure to a provider error
pub fn transport_error(e: &reqwest::Error, provider: &str) -> ProviderError {
    let kind = if e.is_timeout() {
        ProviderErrorKind::Timeout
    } else if e.is_connect() {
        ProviderErrorKind::Connection
    } else {
        ProviderErrorKind::Unknown
    };
    ProviderError::new(e.to_string(), kind, provider)
}

/// Transport failure against a local Ollama daemon
///
/// Connection refusal almost always means the daemon is not running, so
/// the message says so instead of echoing a raw socket error.
pub fn ollama_transport_error(e: &reqwest::Error, base_url: &url::Url) -> ProviderError {
    if e.is_connect() {
        ProviderError::new(
            format!("Cannot connect to Ollama at {base_url}. Is it running?"),
            ProviderErrorKind::Connection,
            "ollama",
        )
    } else {
        transport_error(e, "ollama")
    }
}

/// Build a provider error from a non-success OpenAI-style response body
pub fn openai_error(status: StatusCode, body: &str, provider: &str) -> ProviderError {
    let message = serde_json::from_str::<OpenAiErrorResponse>(body)
        .map_or_else(|_| fallback_message(status), |e| e.error.message);
    ProviderError::from_status(message, status, provider)
}

/// Build a provider error from a non-success Anthropic response body
///
/// Anthropic names the error class in the body, which is more precise
/// than the status code alone.
pub fn anthropic_error(status: StatusCode, body: &str) -> ProviderError {
    serde_json::from_str::<AnthropicErrorResponse>(body).map_or_else(
        |_| ProviderError::from_status(fallback_message(status), status, "anthropic"),
        |e| {
            ProviderError::new(
                e.error.message,
                convert::anthropic::error_kind(&e.error.error_type),
                "anthropic",
            )
            .with_status(status.as_u16())
        },
    )
}

/// Build a provider error from a non-success Ollama response body
pub fn ollama_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<OllamaErrorResponse>(body)
        .map_or_else(|_| fallback_message(status), |e| e.error);
    ProviderError::from_status(message, status, "ollama")
}

fn fallback_message(status: StatusCode) -> String {
    format!("HTTP {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_body_message_is_surfaced() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "invalid_request_error"}}"#;
        let e = openai_error(StatusCode::UNAUTHORIZED, body, "openai");

        assert_eq!(e.message, "Invalid API key");
        assert_eq!(e.kind, ProviderErrorKind::Authentication);
        assert_eq!(e.status_code, Some(401));
    }

    #[test]
    fn opaque_body_falls_back_to_status() {
        let e = openai_error(StatusCode::BAD_GATEWAY, "<html>upstream down</html>", "openai");

        assert_eq!(e.message, "HTTP 502 Bad Gateway");
        assert_eq!(e.kind, ProviderErrorKind::Server);
    }

    #[test]
    fn anthropic_error_type_drives_kind() {
        let body = r#"{"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}"#;
        let e = anthropic_error(StatusCode::TOO_MANY_REQUESTS, body);

        assert_eq!(e.kind, ProviderErrorKind::Server);
        assert_eq!(e.message, "Overloaded");
        assert!(e.is_retryable());
    }

    #[test]
    fn ollama_error_body_is_plain() {
        let e = ollama_error(StatusCode::NOT_FOUND, r#"{"error": "model 'nope' not found"}"#);

        assert_eq!(e.message, "model 'nope' not found");
        assert_eq!(e.kind, ProviderErrorKind::NotFound);
    }
}
