//! Metric scoring engine for retrieval evaluation
//!
//! This crate computes the three retrieval-quality scores for one
//! question at a time by prompting a judge model, one metric per call,
//! with primary/fallback backend switching.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use ragmark_core::error::Result;
use ragmark_core::types::{EvalSample, ScoreSet};
use std::sync::Arc;

mod backend;
mod cloud;
pub mod config;
mod engine;
pub mod error;
mod local;
mod prompts;
mod response;

pub use backend::{BackendProvider, BackendTier, HttpBackendProvider, ScoringBackend};
pub use config::ScoringConfig;
pub use engine::MetricScorer;
pub use error::ScoringError;

/// Trait for scoring engines
#[async_trait]
pub trait ScoreEngine: Send + Sync {
    /// Score one sample on all three metrics
    ///
    /// Returns a fully-populated score set of finite values in [0, 1],
    /// or an error. A partially-scored map never reaches the caller.
    async fn score(&self, sample: &EvalSample) -> Result<ScoreSet>;
}

/// Create a scoring engine from configuration
///
/// The cloud-hosted judge is primary when a credential is configured
/// (config value or `SCORING_API_KEY` env var); otherwise the locally
/// hosted judge is primary and there is no fallback tier.
pub fn create_score_engine(config: &ScoringConfig) -> Result<Arc<dyn ScoreEngine>> {
    let mut config = config.clone();
    if config.api_key.is_none() {
        config.api_key = std::env::var("SCORING_API_KEY").ok();
    }

    let provider = HttpBackendProvider::new(config);
    Ok(Arc::new(MetricScorer::new(Arc::new(provider))))
}
