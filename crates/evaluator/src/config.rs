use ragmark_core::error::{Error, Result};
use ragmark_retrieval::{RetrievalConfig, RetryPolicy};
use ragmark_scoring::ScoringConfig;
use ragmark_storage::PostgresConfig;
use std::time::Duration;

/// Validate a hostname to prevent host injection
///
/// Ensures the hostname does not contain protocol separators, user
/// credentials, or path separators.
fn validate_hostname(host: &str) -> Result<()> {
    if host.contains("://") || host.contains('@') || host.contains('/') {
        return Err(Error::config(format!(
            "Invalid hostname '{host}': contains forbidden characters"
        )));
    }
    if host.is_empty() {
        return Err(Error::config("Hostname cannot be empty".to_string()));
    }
    Ok(())
}

/// Validate a database name
///
/// Only alphanumeric characters, underscores, and hyphens are allowed,
/// within PostgreSQL's 63-character limit.
fn validate_database_name(name: &str) -> Result<()> {
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::config(format!(
            "Invalid database name '{name}': only alphanumeric, underscore, and hyphen allowed"
        )));
    }
    if name.len() > 63 {
        return Err(Error::config(
            "Database name exceeds PostgreSQL's 63-character limit".to_string(),
        ));
    }
    if name.is_empty() {
        return Err(Error::config("Database name cannot be empty".to_string()));
    }
    Ok(())
}

/// Configuration for the evaluation worker
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub postgres: PostgresConfig,
    pub retrieval: RetrievalConfig,
    pub scoring: ScoringConfig,
    pub poll_interval_ms: u64,
}

impl EvaluatorConfig {
    /// Load configuration from environment variables
    ///
    /// Reads the following environment variables with their defaults:
    /// - `POSTGRES_HOST` (default: "localhost") - PostgreSQL server hostname
    /// - `POSTGRES_PORT` (default: 5432) - PostgreSQL server port
    /// - `POSTGRES_DATABASE` (default: "ragmark") - PostgreSQL database name
    /// - `POSTGRES_USER` (default: "ragmark") - PostgreSQL username
    /// - `POSTGRES_PASSWORD` (default: "ragmark") - PostgreSQL password
    /// - `POSTGRES_MAX_CONNECTIONS` (default: 5) - Connection pool size
    /// - `RETRIEVAL_SERVICE_URL` (default: "http://localhost:50056") - Retrieval service base URL
    /// - `RETRIEVAL_TIMEOUT_SECS` (default: 180) - Per-request retrieval timeout
    /// - `RETRIEVAL_MAX_ATTEMPTS` (default: 3) - Retrieval attempts including the first
    /// - `SCORING_API_KEY` (no default) - Cloud judge credential; enables the cloud primary
    /// - `SCORING_CLOUD_API_BASE_URL` - Cloud judge API base URL
    /// - `SCORING_CLOUD_MODEL` - Cloud judge model name
    /// - `SCORING_LOCAL_API_BASE_URL` (default: "http://localhost:11434/v1") - Local judge endpoint
    /// - `SCORING_LOCAL_MODEL` (default: "qwen2.5:7b") - Local judge model name
    /// - `SCORING_TIMEOUT_SECS` (default: 300) - Per-judgement timeout
    /// - `POLL_INTERVAL_MS` (default: 1000) - Pending-job polling interval
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails for the hostname or database
    /// name.
    pub fn load_from_env() -> Result<Self> {
        let postgres_host =
            std::env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
        let postgres_database =
            std::env::var("POSTGRES_DATABASE").unwrap_or_else(|_| "ragmark".to_string());

        validate_hostname(&postgres_host)?;
        validate_database_name(&postgres_database)?;

        let postgres = PostgresConfig {
            host: postgres_host,
            port: std::env::var("POSTGRES_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            database: postgres_database,
            user: std::env::var("POSTGRES_USER").unwrap_or_else(|_| "ragmark".to_string()),
            password: std::env::var("POSTGRES_PASSWORD")
                .unwrap_or_else(|_| "ragmark".to_string()),
            max_connections: std::env::var("POSTGRES_MAX_CONNECTIONS")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or(5),
        };

        let retrieval_defaults = RetrievalConfig::default();
        let retry_defaults = RetryPolicy::default();
        let retrieval = RetrievalConfig {
            base_url: std::env::var("RETRIEVAL_SERVICE_URL")
                .unwrap_or(retrieval_defaults.base_url),
            timeout_secs: std::env::var("RETRIEVAL_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(retrieval_defaults.timeout_secs),
            retry: RetryPolicy {
                max_attempts: std::env::var("RETRIEVAL_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|a| a.parse().ok())
                    .unwrap_or(retry_defaults.max_attempts),
                ..retry_defaults
            },
        };

        let scoring_defaults = ScoringConfig::default();
        let scoring = ScoringConfig {
            api_key: std::env::var("SCORING_API_KEY").ok(),
            cloud_api_base_url: std::env::var("SCORING_CLOUD_API_BASE_URL")
                .unwrap_or(scoring_defaults.cloud_api_base_url),
            cloud_model: std::env::var("SCORING_CLOUD_MODEL")
                .unwrap_or(scoring_defaults.cloud_model),
            local_api_base_url: std::env::var("SCORING_LOCAL_API_BASE_URL")
                .unwrap_or(scoring_defaults.local_api_base_url),
            local_model: std::env::var("SCORING_LOCAL_MODEL")
                .unwrap_or(scoring_defaults.local_model),
            timeout_secs: std::env::var("SCORING_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(scoring_defaults.timeout_secs),
            temperature: scoring_defaults.temperature,
            max_output_tokens: scoring_defaults.max_output_tokens,
        };

        Ok(Self {
            postgres,
            retrieval,
            scoring,
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1000),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
