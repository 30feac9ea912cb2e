//! HTTP client for the retrieval service

use crate::config::RetrievalConfig;
use crate::error::RetrievalError;
use crate::{Retrieval, RetrievalClient, RetryPolicy};
use async_trait::async_trait;
use ragmark_core::error::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Request payload for the retrieval query endpoint
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    #[serde(rename = "topK")]
    top_k: usize,
    /// Evaluation always runs in retrieval-only mode
    mode: &'static str,
    /// Cache is disabled so every question gets fresh results
    #[serde(rename = "useCache")]
    use_cache: bool,
}

/// Response from the retrieval query endpoint
#[derive(Debug, Deserialize)]
struct QueryResponse {
    contexts: Vec<Value>,
    #[serde(default)]
    cached: bool,
}

/// Extract context texts from the service's mixed response shapes
///
/// Contexts arrive either as plain strings or as objects carrying a
/// `content` field (`text` as a fallback); entries in neither shape are
/// skipped.
fn extract_contexts(values: Vec<Value>) -> Vec<String> {
    let mut contexts = Vec::with_capacity(values.len());

    for value in values {
        match value {
            Value::String(text) => contexts.push(text),
            Value::Object(fields) => {
                if let Some(Value::String(content)) = fields.get("content") {
                    contexts.push(content.clone());
                } else if let Some(Value::String(text)) = fields.get("text") {
                    contexts.push(text.clone());
                } else {
                    warn!("Context object missing 'content' field, skipping");
                }
            }
            other => {
                warn!("Unexpected context shape: {other}, skipping");
            }
        }
    }

    contexts
}

/// Retrieval service client over HTTP
pub struct HttpRetrievalClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpRetrievalClient {
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        info!("Initializing retrieval client");
        info!("  Base URL: {}", config.base_url);
        info!("  Timeout: {}s", config.timeout_secs);
        info!("  Max attempts: {}", config.retry.max_attempts);

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                RetrievalError::Config(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
        })
    }

    async fn query_once(
        &self,
        question: &str,
        top_k: usize,
    ) -> std::result::Result<Retrieval, RetrievalError> {
        let started = Instant::now();
        let query_url = format!("{}/query", self.base_url);
        let request = QueryRequest {
            query: question,
            top_k,
            mode: "retrieval_only",
            use_cache: false,
        };

        let response = self
            .client
            .post(&query_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrievalError::Timeout(e.to_string())
                } else {
                    RetrievalError::Connection(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RetrievalError::Service { status, message });
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()))?;

        let contexts = extract_contexts(body.contexts);
        let retrieval_time_ms = started.elapsed().as_millis() as u64;

        debug!(
            "Retrieved {} contexts in {retrieval_time_ms}ms (cached: {})",
            contexts.len(),
            body.cached
        );

        Ok(Retrieval {
            contexts,
            retrieval_time_ms,
            cached: body.cached,
        })
    }
}

#[async_trait]
impl RetrievalClient for HttpRetrievalClient {
    async fn query(&self, question: &str, top_k: usize) -> Result<Retrieval> {
        let mut attempt: u32 = 1;

        loop {
            match self.query_once(question, top_k).await {
                Ok(retrieval) => return Ok(retrieval),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff_for_retry(attempt);
                    warn!(
                        "Retrieval attempt {attempt}/{} failed: {e}, retrying in {backoff:?}",
                        self.retry.max_attempts
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Retrieval failed after {attempt} attempt(s): {e}");
                    return Err(e.into());
                }
            }
        }
    }
}
