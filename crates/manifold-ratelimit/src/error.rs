use thiserror::Error;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Admission denied; try again after `retry_after` seconds
    #[error("rate limit exceeded, retry in {retry_after}s")]
    Exceeded {
        /// Seconds until the current window resets
        retry_after: u64,
    },
}

impl RateLimitError {
    /// Seconds until the limit resets
    pub const fn retry_after(&self) -> u64 {
        match self {
            Self::Exceeded { retry_after } => *retry_after,
        }
    }
}
