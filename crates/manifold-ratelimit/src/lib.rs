//! Per-model sliding-window admission control
//!
//! Tracks one fixed 60-second window per model id. Admission is checked
//! *before* a network request is issued; a rejected request never
//! reaches the backend. Models without a configured limit are always
//! admitted.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;

pub use error::RateLimitError;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Length of one admission window
const WINDOW: Duration = Duration::from_secs(60);

/// Request budget for one model within a window
#[derive(Debug, Clone, Copy)]
pub struct ModelLimit {
    /// Requests admitted per window
    pub requests_per_minute: u32,
}

/// Live window state for one model
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Sliding-window limiter keyed by model id
pub struct SlidingWindowLimiter {
    limits: HashMap<String, ModelLimit>,
    default_limit: Option<ModelLimit>,
    windows: DashMap<String, Window>,
    window: Duration,
}

impl SlidingWindowLimiter {
    /// Create a limiter with per-model budgets and an optional default
    /// applied to models absent from the table
    pub fn new(limits: HashMap<String, ModelLimit>, default_limit: Option<ModelLimit>) -> Self {
        Self {
            limits,
            default_limit,
            windows: DashMap::new(),
            window: WINDOW,
        }
    }

    /// Override the window length (test constructor)
    #[doc(hidden)]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Whether a request for `model` may be issued right now
    ///
    /// Does not consume budget; call [`record`](Self::record) once the
    /// request is actually sent.
    pub fn check(&self, model: &str) -> Result<(), RateLimitError> {
        let Some(limit) = self.limit_for(model) else {
            return Ok(());
        };

        let Some(window) = self.windows.get(model).map(|w| *w) else {
            return Ok(());
        };

        let now = Instant::now();
        if now >= window.reset_at || window.count < limit.requests_per_minute {
            return Ok(());
        }

        let retry_after = window.reset_at.saturating_duration_since(now).as_secs().max(1);
        tracing::debug!(model, count = window.count, retry_after, "admission rejected");
        Err(RateLimitError::Exceeded { retry_after })
    }

    /// Record an issued request, opening a fresh window if the previous
    /// one has expired
    pub fn record(&self, model: &str) {
        if self.limit_for(model).is_none() {
            return;
        }

        let now = Instant::now();
        self.windows
            .entry(model.to_owned())
            .and_modify(|w| {
                if now >= w.reset_at {
                    w.count = 1;
                    w.reset_at = now + self.window;
                } else {
                    w.count += 1;
                }
            })
            .or_insert(Window {
                count: 1,
                reset_at: now + self.window,
            });
    }

    /// Drop all window state (test teardown / configuration change)
    pub fn reset(&self) {
        self.windows.clear();
    }

    fn limit_for(&self, model: &str) -> Option<ModelLimit> {
        self.limits.get(model).copied().or(self.default_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rpm: u32) -> SlidingWindowLimiter {
        let mut limits = HashMap::new();
        limits.insert("claude-sonnet-4-20250514".to_owned(), ModelLimit { requests_per_minute: rpm });
        SlidingWindowLimiter::new(limits, None)
    }

    #[test]
    fn third_request_in_window_is_rejected() {
        let limiter = limiter(2);
        let model = "claude-sonnet-4-20250514";

        assert!(limiter.check(model).is_ok());
        limiter.record(model);
        assert!(limiter.check(model).is_ok());
        limiter.record(model);

        let err = limiter.check(model).expect_err("budget exhausted");
        assert!(err.retry_after() >= 1);
    }

    #[test]
    fn unknown_model_is_always_admitted() {
        let limiter = limiter(1);
        for _ in 0..10 {
            assert!(limiter.check("some-other-model").is_ok());
            limiter.record("some-other-model");
        }
    }

    #[test]
    fn expired_window_admits_and_reopens() {
        let mut limits = HashMap::new();
        limits.insert("m".to_owned(), ModelLimit { requests_per_minute: 1 });
        let limiter = SlidingWindowLimiter::new(limits, None).with_window(Duration::from_millis(10));

        limiter.record("m");
        assert!(limiter.check("m").is_err());

        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("m").is_ok());

        // Recording after expiry opens a fresh window with count 1
        limiter.record("m");
        assert!(limiter.check("m").is_err());
    }

    #[test]
    fn default_limit_applies_to_unlisted_models() {
        let limiter = SlidingWindowLimiter::new(HashMap::new(), Some(ModelLimit { requests_per_minute: 1 }));
        limiter.record("anything");
        assert!(limiter.check("anything").is_err());
    }

    #[test]
    fn reset_clears_windows() {
        let limiter = limiter(1);
        limiter.record("claude-sonnet-4-20250514");
        assert!(limiter.check("claude-sonnet-4-20250514").is_err());
        limiter.reset();
        assert!(limiter.check("claude-sonnet-4-20250514").is_ok());
    }
}
