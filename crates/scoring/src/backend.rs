//! Scoring backend handles and their acquisition

use crate::cloud::CloudBackend;
use crate::config::ScoringConfig;
use crate::local::LocalBackend;
use async_trait::async_trait;
use ragmark_core::error::Result;
use ragmark_core::types::{EvalSample, Metric};
use std::fmt;
use tracing::info;

/// Which model-serving backend a handle talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendTier {
    /// Cloud-hosted judge model, selected when a credential is configured
    Cloud,
    /// Locally hosted judge model
    Local,
}

impl fmt::Display for BackendTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud => write!(f, "cloud"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// A handle to one model-serving backend
///
/// Handles are short-lived: the engine acquires one per single-metric
/// call and drops it when the call finishes, so a reused execution
/// context never carries over between metrics.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    fn tier(&self) -> BackendTier;

    /// Run one single-metric judgement for one sample
    ///
    /// Returns the model's raw reply text; sanitization and score
    /// extraction happen in the engine.
    async fn judge(&self, metric: Metric, sample: &EvalSample) -> Result<String>;
}

/// Acquires scoring backend handles
#[async_trait]
pub trait BackendProvider: Send + Sync {
    /// The tier every question is scored on first
    fn primary_tier(&self) -> BackendTier;

    /// The tier retried when the primary pass leaves metrics unset
    ///
    /// None when the local model is already primary.
    fn fallback_tier(&self) -> Option<BackendTier>;

    async fn acquire(&self, tier: BackendTier) -> Result<Box<dyn ScoringBackend>>;
}

/// Backend provider over the configured HTTP judge services
pub struct HttpBackendProvider {
    config: ScoringConfig,
}

impl HttpBackendProvider {
    pub fn new(config: ScoringConfig) -> Self {
        if config.api_key.is_some() {
            info!(
                "Scoring credential configured, using cloud judge {} as primary",
                config.cloud_model
            );
        } else {
            info!(
                "No scoring credential configured, using local judge {} as primary",
                config.local_model
            );
        }

        Self { config }
    }
}

#[async_trait]
impl BackendProvider for HttpBackendProvider {
    fn primary_tier(&self) -> BackendTier {
        if self.config.api_key.is_some() {
            BackendTier::Cloud
        } else {
            BackendTier::Local
        }
    }

    fn fallback_tier(&self) -> Option<BackendTier> {
        match self.primary_tier() {
            BackendTier::Cloud => Some(BackendTier::Local),
            BackendTier::Local => None,
        }
    }

    async fn acquire(&self, tier: BackendTier) -> Result<Box<dyn ScoringBackend>> {
        match tier {
            BackendTier::Cloud => Ok(Box::new(CloudBackend::new(&self.config)?)),
            BackendTier::Local => Ok(Box::new(LocalBackend::new(&self.config)?)),
        }
    }
}
