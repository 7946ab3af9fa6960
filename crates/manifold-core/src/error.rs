//! Unified provider error taxonomy
//!
//! `ProviderError` is the only error shape that crosses the
//! provider/caller boundary; raw backend errors are never propagated
//! unwrapped. Retryability is decided on the structured kind and status
//! code, never by matching error-message text.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Missing or rejected credentials
    Authentication,
    /// Credentials valid but not allowed for this resource
    Permission,
    /// Model or endpoint does not exist
    NotFound,
    /// Backend or local admission rate limit hit
    RateLimit,
    /// Backend-side failure
    Server,
    /// Request or socket timed out
    Timeout,
    /// Request was malformed or rejected by validation
    Validation,
    /// Could not reach the backend at all
    Connection,
    /// Operation not supported by this backend
    NotImplemented,
    /// Anything else
    Unknown,
}

/// Error surfaced to callers by every provider operation
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    /// Human-readable, backend-specific message
    pub message: String,
    /// Taxonomy classification
    pub kind: ProviderErrorKind,
    /// Provider id that produced the error
    pub provider: String,
    /// HTTP status code, when one was observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ProviderError {
    /// Create an error with no associated HTTP status
    pub fn new(message: impl Into<String>, kind: ProviderErrorKind, provider: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            provider: provider.into(),
            status_code: None,
        }
    }

    /// Create an error classified from an HTTP status code
    ///
    /// The message is kept verbatim; classification uses the shared
    /// status table so every backend maps statuses identically.
    pub fn from_status(message: impl Into<String>, status: StatusCode, provider: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind_for_status(status),
            provider: provider.into(),
            status_code: Some(status.as_u16()),
        }
    }

    /// Attach an HTTP status code
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Whether the shared retry policy may retry this error
    ///
    /// Rate-limit and server errors are retryable, as is any error that
    /// carries a 429/500/503 status. Authentication and validation
    /// failures are never retried.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ProviderErrorKind::Authentication | ProviderErrorKind::Validation => false,
            ProviderErrorKind::RateLimit | ProviderErrorKind::Server => true,
            _ => matches!(self.status_code, Some(429 | 500 | 503)),
        }
    }
}

/// Shared HTTP-status → taxonomy table
fn kind_for_status(status: StatusCode) -> ProviderErrorKind {
    match status.as_u16() {
        401 => ProviderErrorKind::Authentication,
        403 => ProviderErrorKind::Permission,
        404 => ProviderErrorKind::NotFound,
        408 => ProviderErrorKind::Timeout,
        429 => ProviderErrorKind::RateLimit,
        400 | 422 => ProviderErrorKind::Validation,
        501 => ProviderErrorKind::NotImplemented,
        500 | 502 | 503 => ProviderErrorKind::Server,
        _ => ProviderErrorKind::Unknown,
    }
}
