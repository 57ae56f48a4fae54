//! Retry policy for upstream count queries
//!
//! **Backoff Strategy:**
//! - Transient failures (transport, timeout, non-2xx, malformed JSON): exponential,
//!   `base_delay * 2^(attempt-1)` capped at `max_delay`, plus up to `base_delay` of jitter
//! - Rate-limit responses (429): `rate_limit_delay * n` for the n-th rate-limit wait;
//!   these waits do not consume failure attempts
//!
//! Retry lives here and in the fetcher only; callers above the fetcher never retry.

use hemis_common::config::AggregationConfig;
use rand::Rng;
use std::time::Duration;

use crate::upstream::UpstreamError;

/// How a failed request is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429: wait and retry without counting a failure
    RateLimited,
    /// Anything else: counts toward `max_attempts`
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub rate_limit_delay: Duration,
    pub max_rate_limit_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AggregationConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AggregationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.base_delay_ms)),
            rate_limit_delay: Duration::from_millis(config.rate_limit_delay_ms),
            max_rate_limit_retries: config.max_rate_limit_retries,
        }
    }

    /// Same attempt bounds, no sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
            max_rate_limit_retries: 10,
        }
    }

    pub fn classify(&self, err: &UpstreamError) -> FailureKind {
        match err {
            UpstreamError::RateLimited => FailureKind::RateLimited,
            UpstreamError::Status(429, _) => FailureKind::RateLimited,
            _ => FailureKind::Transient,
        }
    }

    /// Exponential backoff after the `attempt`-th failure (1-based), without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// [`backoff`](Self::backoff) plus uniform jitter in `0..=base_delay`
    pub fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let jitter = if base_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=base_ms)
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }

    /// Wait before retrying after the `n`-th rate-limit response (1-based)
    pub fn rate_limit_backoff(&self, n: u32) -> Duration {
        self.rate_limit_delay.saturating_mul(n.max(1))
    }
}
