mod client;
mod mock;
mod types;

pub use client::PostgresClient;
pub use mock::MockPostgresClient;
pub use types::{JobRow, NewResult, PendingEvaluation, QuestionRow, ResultRow, RunRow};

use async_trait::async_trait;
use ragmark_core::error::Result;
use ragmark_core::types::{AverageScores, RunStatistics, RunStatus};
use uuid::Uuid;

/// Persistence operations for evaluation jobs, runs, questions and results
///
/// The orchestrator is the sole writer for a run's rows while the run is
/// processing; all mutations here are single-row statements against that
/// run or its job.
#[async_trait]
pub trait PostgresClientTrait: Send + Sync {
    async fn get_job(&self, job_id: Uuid) -> Result<Option<JobRow>>;

    async fn get_run(&self, run_id: Uuid) -> Result<Option<RunRow>>;

    /// Transition a job to `processing` and stamp its start time
    async fn mark_job_started(&self, job_id: Uuid) -> Result<()>;

    /// Update the durable progress fields on a job
    async fn update_job_progress(
        &self,
        job_id: Uuid,
        progress_percent: u8,
        current_step: &str,
    ) -> Result<()>;

    /// Transition a job to `completed` and stamp its completion time
    async fn mark_job_completed(&self, job_id: Uuid) -> Result<()>;

    /// Transition a job to `failed` with an error message
    async fn mark_job_failed(&self, job_id: Uuid, error_message: &str) -> Result<()>;

    /// Update a run's status, stamping completed_at for terminal states
    async fn update_run_status(&self, run_id: Uuid, status: RunStatus) -> Result<()>;

    async fn set_run_total_questions(&self, run_id: Uuid, total: usize) -> Result<()>;

    /// Record which question the run is currently processing
    async fn set_current_question(
        &self,
        run_id: Uuid,
        question_index: usize,
        question_id: Uuid,
    ) -> Result<()>;

    async fn record_question_success(&self, run_id: Uuid) -> Result<()>;

    async fn record_question_failure(&self, run_id: Uuid) -> Result<()>;

    /// Store aggregate results on a run after its question loop finishes
    async fn finalize_run(
        &self,
        run_id: Uuid,
        average_scores: &AverageScores,
        statistics: &RunStatistics,
        processing_time_ms: u64,
    ) -> Result<()>;

    /// Fetch a dataset's questions ordered by `order_index`
    ///
    /// The ordering is load-bearing: it defines the sequential processing
    /// order of the run.
    async fn get_questions(&self, dataset_id: Uuid) -> Result<Vec<QuestionRow>>;

    /// Append one result row
    ///
    /// Results are append-only and unique per (run_id, question_id);
    /// inserting a duplicate is an error.
    async fn insert_result(&self, result: NewResult) -> Result<Uuid>;

    async fn get_results_for_run(&self, run_id: Uuid) -> Result<Vec<ResultRow>>;

    /// Atomically claim the oldest pending job for this worker
    ///
    /// The claimed job is transitioned to `processing` in the same
    /// statement so that concurrent workers never pick up the same run.
    async fn claim_pending_job(&self) -> Result<Option<PendingEvaluation>>;
}
