//! Configuration for the retrieval client

use std::time::Duration;

/// Retry policy for the retrieval collaborator
///
/// The attempt count and backoff window are operational knobs injected
/// into the client, not constants of the adapter contract.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total request attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (1-based), doubling from the initial
    /// backoff up to the cap
    pub fn backoff_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_backoff)
    }
}

/// Configuration for the retrieval service client
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Base URL of the retrieval service
    pub base_url: String,
    /// Per-request timeout; retrieval can be slow
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:50056".to_string(),
            timeout_secs: 180,
            retry: RetryPolicy::default(),
        }
    }
}
