//! Retrieval service client
//!
//! This crate provides the adapter the orchestrator uses to fetch
//! contexts for a question from the external retrieval service.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use ragmark_core::error::Result;
use std::sync::Arc;
use tracing::info;

mod client;
pub mod config;
pub mod error;
mod mock;

pub use client::HttpRetrievalClient;
pub use config::{RetrievalConfig, RetryPolicy};
pub use error::RetrievalError;
pub use mock::MockRetrievalClient;

/// Contexts retrieved for one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    /// Retrieved context passages, in service ranking order
    pub contexts: Vec<String>,
    pub retrieval_time_ms: u64,
    /// Whether the service answered from its cache
    pub cached: bool,
}

/// Trait for retrieval clients
///
/// From the caller's view `query` is a single blocking call with no
/// partial results: transient failures are retried internally, and after
/// exhaustion one typed failure surfaces.
#[async_trait]
pub trait RetrievalClient: Send + Sync {
    /// Fetch the top-k contexts for a question
    async fn query(&self, question: &str, top_k: usize) -> Result<Retrieval>;
}

/// Create a retrieval client from configuration
pub fn create_retrieval_client(config: &RetrievalConfig) -> Result<Arc<dyn RetrievalClient>> {
    info!("Creating retrieval client for {}", config.base_url);
    let client = HttpRetrievalClient::new(config)?;
    Ok(Arc::new(client))
}
