//! Progress publishing to the transient cache and durable job record

use chrono::{DateTime, Utc};
use moka::future::Cache;
use ragmark_core::error::Result;
use ragmark_storage::PostgresClientTrait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Expiry for transient progress entries
///
/// A crashed worker's stale entry self-clears after this window; readers
/// then fall back to the durable job record.
const PROGRESS_TTL: Duration = Duration::from_secs(3600);

/// Cache key for a job's transient progress entry
pub fn progress_cache_key(job_id: Uuid) -> String {
    format!("eval_progress:{job_id}")
}

/// One published progress snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub progress_percent: u8,
    pub current_step: String,
    pub updated_at: DateTime<Utc>,
}

/// Dual-writer for run progress
///
/// Every publish writes a fast transient cache entry and the durable job
/// record in the same logical step. The cache is best-effort and never
/// authoritative; its absence is not an error condition.
pub struct ProgressPublisher {
    cache: Cache<String, ProgressEntry>,
    postgres: Arc<dyn PostgresClientTrait>,
}

impl ProgressPublisher {
    pub fn new(postgres: Arc<dyn PostgresClientTrait>) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(PROGRESS_TTL)
                .build(),
            postgres,
        }
    }

    /// Publish a progress snapshot for a job
    pub async fn publish(&self, job_id: Uuid, percent: u8, step: &str) -> Result<()> {
        let entry = ProgressEntry {
            progress_percent: percent,
            current_step: step.to_string(),
            updated_at: Utc::now(),
        };

        self.cache.insert(progress_cache_key(job_id), entry).await;
        self.postgres
            .update_job_progress(job_id, percent, step)
            .await
    }

    /// Read a job's progress, preferring the unexpired cache entry
    pub async fn get(&self, job_id: Uuid) -> Result<Option<ProgressEntry>> {
        if let Some(entry) = self.cache.get(&progress_cache_key(job_id)).await {
            return Ok(Some(entry));
        }

        let Some(job) = self.postgres.get_job(job_id).await? else {
            return Ok(None);
        };

        Ok(Some(ProgressEntry {
            progress_percent: job.progress_percent.clamp(0, 100) as u8,
            current_step: job.current_step.unwrap_or_default(),
            updated_at: job.started_at.unwrap_or(job.created_at),
        }))
    }
}
