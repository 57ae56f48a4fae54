//! Student count fetcher
//!
//! One upstream query per attempt, totals read from the pagination block. Failures are
//! absorbed: an exhausted query yields [`CountResult::Unknown`], which counts as 0 so a
//! single missing cell never aborts an aggregation run.

use std::sync::Arc;

use crate::filters::CountFilter;
use crate::retry::{FailureKind, RetryPolicy};
use crate::upstream::{envelope, HemisApi};

/// Outcome of one count query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountResult {
    Known(u64),
    /// Retries exhausted; arithmetic treats this as 0
    Unknown,
}

impl CountResult {
    pub fn value(&self) -> u64 {
        match self {
            CountResult::Known(n) => *n,
            CountResult::Unknown => 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CountResult::Unknown)
    }
}

/// Issues count queries under a [`RetryPolicy`]
#[derive(Clone)]
pub struct CountFetcher {
    api: Arc<dyn HemisApi>,
    policy: RetryPolicy,
}

impl CountFetcher {
    pub fn new(api: Arc<dyn HemisApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    /// Count students matching `filter`
    ///
    /// Transient failures give up after `max_attempts`. Rate-limit responses are retried
    /// without consuming attempts, but only `max_rate_limit_retries` times.
    pub async fn fetch(&self, filter: &CountFilter) -> CountResult {
        let mut failures = 0u32;
        let mut rate_limited = 0u32;

        loop {
            let err = match self.api.student_count_page(filter).await {
                Ok(payload) => {
                    let total = envelope::total_count(&payload);
                    if failures + rate_limited > 0 {
                        tracing::debug!(
                            filter = %filter,
                            failures,
                            rate_limited,
                            total,
                            "Count query succeeded after retry"
                        );
                    }
                    return CountResult::Known(total);
                }
                Err(err) => err,
            };

            let delay = match self.policy.classify(&err) {
                FailureKind::RateLimited => {
                    rate_limited += 1;
                    if rate_limited > self.policy.max_rate_limit_retries {
                        tracing::error!(
                            filter = %filter,
                            rate_limited,
                            "Count query still rate limited, giving up"
                        );
                        return CountResult::Unknown;
                    }
                    self.policy.rate_limit_backoff(rate_limited)
                }
                FailureKind::Transient => {
                    failures += 1;
                    if failures >= self.policy.max_attempts {
                        tracing::error!(
                            filter = %filter,
                            attempts = failures,
                            error = %err,
                            "Failed to fetch count, treating as 0"
                        );
                        return CountResult::Unknown;
                    }
                    self.policy.backoff_with_jitter(failures)
                }
            };

            tracing::warn!(
                filter = %filter,
                error = %err,
                failures,
                rate_limited,
                backoff_ms = delay.as_millis() as u64,
                "Count query failed, will retry after backoff"
            );

            tokio::time::sleep(delay).await;
        }
    }
}
