//! Retry with jittered exponential backoff
//!
//! Only errors whose [`ProviderError::is_retryable`] is true are
//! retried; everything else surfaces immediately. The final attempt's
//! error is returned unchanged.

use std::time::Duration;

use manifold_core::ProviderError;
use tracing::warn;

/// Backoff parameters for a retried operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Run `operation`, retrying transient failures per `policy`
///
/// Each retry multiplies the delay by a factor in `[1.5, 2.0)` chosen
/// uniformly at random, clamped to `policy.max_delay`.
pub async fn with_retry<F, Fut, T>(
    policy: RetryPolicy,
    provider: &str,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut delay = policy.base_delay;

    for attempt in 0..=policy.max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                warn!(
                    provider = %provider,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient provider error, backing off"
                );
                tokio::time::sleep(delay).await;
                let factor = 1.5 + rand::random::<f64>() * 0.5;
                delay = delay.mul_f64(factor).min(policy.max_delay);
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("loop returns on final attempt")
}
