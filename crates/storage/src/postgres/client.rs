use super::types::{JobRow, NewResult, PendingEvaluation, QuestionRow, ResultRow, RunRow};
use super::PostgresClientTrait;
use async_trait::async_trait;
use ragmark_core::error::{Error, Result};
use ragmark_core::types::{AverageScores, RunStatistics, RunStatus};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run pending schema migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to run migrations: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl PostgresClientTrait for PostgresClient {
    async fn get_job(&self, job_id: Uuid) -> Result<Option<JobRow>> {
        let job = sqlx::query_as::<_, JobRow>(
            "SELECT job_id, status, progress_percent, current_step, created_by,
                    error_message, created_at, started_at, completed_at
             FROM evaluation_jobs
             WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to fetch job: {e}")))?;

        Ok(job)
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<RunRow>> {
        let run = sqlx::query_as::<_, RunRow>(
            "SELECT run_id, job_id, dataset_id, status, top_k, total_questions,
                    successful_questions, failed_questions, current_question_index,
                    current_question_id, average_scores, statistics,
                    processing_time_ms, created_at, completed_at
             FROM evaluation_runs
             WHERE run_id = $1",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to fetch run: {e}")))?;

        Ok(run)
    }

    async fn mark_job_started(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE evaluation_jobs
             SET status = 'processing', started_at = COALESCE(started_at, NOW())
             WHERE job_id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to mark job started: {e}")))?;

        Ok(())
    }

    async fn update_job_progress(
        &self,
        job_id: Uuid,
        progress_percent: u8,
        current_step: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE evaluation_jobs
             SET progress_percent = $1, current_step = $2
             WHERE job_id = $3",
        )
        .bind(i32::from(progress_percent))
        .bind(current_step)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to update job progress: {e}")))?;

        Ok(())
    }

    async fn mark_job_completed(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE evaluation_jobs
             SET status = 'completed', completed_at = NOW(), error_message = NULL
             WHERE job_id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to mark job completed: {e}")))?;

        Ok(())
    }

    async fn mark_job_failed(&self, job_id: Uuid, error_message: &str) -> Result<()> {
        // Truncate to keep oversized upstream messages out of the row
        let error_message = if error_message.len() > 1000 {
            &error_message[..1000]
        } else {
            error_message
        };

        sqlx::query(
            "UPDATE evaluation_jobs
             SET status = 'failed', completed_at = NOW(), error_message = $1
             WHERE job_id = $2",
        )
        .bind(error_message)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to mark job failed: {e}")))?;

        Ok(())
    }

    async fn update_run_status(&self, run_id: Uuid, status: RunStatus) -> Result<()> {
        let query = if status.is_terminal() {
            "UPDATE evaluation_runs
             SET status = $1, completed_at = NOW()
             WHERE run_id = $2"
        } else {
            "UPDATE evaluation_runs
             SET status = $1
             WHERE run_id = $2"
        };

        sqlx::query(query)
            .bind(status.to_string())
            .bind(run_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to update run status: {e}")))?;

        Ok(())
    }

    async fn set_run_total_questions(&self, run_id: Uuid, total: usize) -> Result<()> {
        let total = i32::try_from(total)
            .map_err(|_| Error::storage("Question count too large for i32"))?;

        sqlx::query("UPDATE evaluation_runs SET total_questions = $1 WHERE run_id = $2")
            .bind(total)
            .bind(run_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to set total questions: {e}")))?;

        Ok(())
    }

    async fn set_current_question(
        &self,
        run_id: Uuid,
        question_index: usize,
        question_id: Uuid,
    ) -> Result<()> {
        let question_index = i32::try_from(question_index)
            .map_err(|_| Error::storage("Question index too large for i32"))?;

        sqlx::query(
            "UPDATE evaluation_runs
             SET current_question_index = $1, current_question_id = $2
             WHERE run_id = $3",
        )
        .bind(question_index)
        .bind(question_id)
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to set current question: {e}")))?;

        Ok(())
    }

    async fn record_question_success(&self, run_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE evaluation_runs
             SET successful_questions = successful_questions + 1
             WHERE run_id = $1",
        )
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to record question success: {e}")))?;

        Ok(())
    }

    async fn record_question_failure(&self, run_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE evaluation_runs
             SET failed_questions = failed_questions + 1
             WHERE run_id = $1",
        )
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to record question failure: {e}")))?;

        Ok(())
    }

    async fn finalize_run(
        &self,
        run_id: Uuid,
        average_scores: &AverageScores,
        statistics: &RunStatistics,
        processing_time_ms: u64,
    ) -> Result<()> {
        let average_scores = serde_json::to_value(average_scores)
            .map_err(|e| Error::storage(format!("Failed to serialize average scores: {e}")))?;
        let statistics = serde_json::to_value(statistics)
            .map_err(|e| Error::storage(format!("Failed to serialize statistics: {e}")))?;
        let processing_time_ms = i64::try_from(processing_time_ms)
            .map_err(|_| Error::storage("Processing time too large for i64"))?;

        sqlx::query(
            "UPDATE evaluation_runs
             SET average_scores = $1, statistics = $2, processing_time_ms = $3
             WHERE run_id = $4",
        )
        .bind(average_scores)
        .bind(statistics)
        .bind(processing_time_ms)
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to finalize run: {e}")))?;

        Ok(())
    }

    async fn get_questions(&self, dataset_id: Uuid) -> Result<Vec<QuestionRow>> {
        let questions = sqlx::query_as::<_, QuestionRow>(
            "SELECT question_id, dataset_id, question, expected_context,
                    order_index, created_at
             FROM dataset_questions
             WHERE dataset_id = $1
             ORDER BY order_index ASC",
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to fetch questions: {e}")))?;

        Ok(questions)
    }

    async fn insert_result(&self, result: NewResult) -> Result<Uuid> {
        let result_id = Uuid::new_v4();
        let (precision, recall, relevancy) = result.score_columns();
        let (error_kind, error_message) = result.error_columns();
        let retrieved_contexts = serde_json::to_value(&result.retrieved_contexts)
            .map_err(|e| Error::storage(format!("Failed to serialize contexts: {e}")))?;

        sqlx::query(
            "INSERT INTO evaluation_results (
                result_id, run_id, question_id, question, expected_context,
                retrieved_contexts, context_precision, context_recall,
                context_relevancy, error_kind, error_message, result_metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(result_id)
        .bind(result.run_id)
        .bind(result.question_id)
        .bind(&result.question)
        .bind(&result.expected_context)
        .bind(retrieved_contexts)
        .bind(precision)
        .bind(recall)
        .bind(relevancy)
        .bind(error_kind.map(|k| k.as_str()))
        .bind(error_message)
        .bind(&result.metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to insert result: {e}")))?;

        debug!(
            run_id = %result.run_id,
            question_id = %result.question_id,
            "Inserted evaluation result"
        );

        Ok(result_id)
    }

    async fn get_results_for_run(&self, run_id: Uuid) -> Result<Vec<ResultRow>> {
        let results = sqlx::query_as::<_, ResultRow>(
            "SELECT result_id, run_id, question_id, question, expected_context,
                    retrieved_contexts, context_precision, context_recall,
                    context_relevancy, error_kind, error_message, result_metadata,
                    created_at
             FROM evaluation_results
             WHERE run_id = $1
             ORDER BY created_at ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to fetch results: {e}")))?;

        Ok(results)
    }

    async fn claim_pending_job(&self) -> Result<Option<PendingEvaluation>> {
        // Single-statement claim: the row lock from FOR UPDATE SKIP LOCKED
        // plus the status transition keeps concurrent workers off the same run.
        let claimed = sqlx::query_as::<_, PendingEvaluation>(
            "UPDATE evaluation_jobs j
             SET status = 'processing', started_at = NOW()
             FROM evaluation_runs r
             WHERE r.job_id = j.job_id
               AND j.job_id = (
                   SELECT job_id FROM evaluation_jobs
                   WHERE status = 'pending'
                   ORDER BY created_at ASC
                   LIMIT 1
                   FOR UPDATE SKIP LOCKED
               )
             RETURNING j.job_id, r.run_id, r.dataset_id, r.top_k",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to claim pending job: {e}")))?;

        Ok(claimed)
    }
}
