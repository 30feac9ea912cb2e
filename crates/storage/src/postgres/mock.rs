//! Mock PostgreSQL client for testing

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::types::{JobRow, NewResult, PendingEvaluation, QuestionRow, ResultRow, RunRow};
use super::PostgresClientTrait;
use async_trait::async_trait;
use chrono::Utc;
use ragmark_core::error::{Error, Result};
use ragmark_core::types::{AverageScores, JobStatus, RunStatistics, RunStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MockData {
    jobs: HashMap<Uuid, JobRow>,
    runs: HashMap<Uuid, RunRow>,
    questions: Vec<QuestionRow>,
    results: Vec<ResultRow>,
    /// Every (percent, step) write, in publish order
    progress_history: Vec<(u8, String)>,
}

/// In-memory stand-in for the PostgreSQL client
///
/// Enforces the same append-only uniqueness constraint on results as the
/// real schema, and records the full progress write history so tests can
/// assert monotonicity.
#[derive(Default)]
pub struct MockPostgresClient {
    data: Mutex<MockData>,
}

impl MockPostgresClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pending job
    pub fn seed_job(&self, job_id: Uuid) {
        let mut data = self.data.lock().unwrap();
        data.jobs.insert(
            job_id,
            JobRow {
                job_id,
                status: JobStatus::Pending.to_string(),
                progress_percent: 0,
                current_step: None,
                created_by: Some("test".to_string()),
                error_message: None,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
            },
        );
    }

    /// Seed a pending run attached to a job
    pub fn seed_run(&self, run_id: Uuid, job_id: Uuid, dataset_id: Uuid, top_k: i32) {
        let mut data = self.data.lock().unwrap();
        data.runs.insert(
            run_id,
            RunRow {
                run_id,
                job_id,
                dataset_id,
                status: RunStatus::Pending.to_string(),
                top_k,
                total_questions: 0,
                successful_questions: 0,
                failed_questions: 0,
                current_question_index: None,
                current_question_id: None,
                average_scores: None,
                statistics: None,
                processing_time_ms: None,
                created_at: Utc::now(),
                completed_at: None,
            },
        );
    }

    /// Seed a question; `order_index` defines its position in the run
    pub fn seed_question(
        &self,
        dataset_id: Uuid,
        order_index: i32,
        question: &str,
        expected_context: &str,
    ) -> Uuid {
        let question_id = Uuid::new_v4();
        let mut data = self.data.lock().unwrap();
        data.questions.push(QuestionRow {
            question_id,
            dataset_id,
            question: question.to_string(),
            expected_context: expected_context.to_string(),
            order_index,
            created_at: Utc::now(),
        });
        question_id
    }

    pub fn job(&self, job_id: Uuid) -> Option<JobRow> {
        self.data.lock().unwrap().jobs.get(&job_id).cloned()
    }

    pub fn run(&self, run_id: Uuid) -> Option<RunRow> {
        self.data.lock().unwrap().runs.get(&run_id).cloned()
    }

    pub fn results(&self) -> Vec<ResultRow> {
        self.data.lock().unwrap().results.clone()
    }

    /// Every progress write in publish order, for monotonicity assertions
    pub fn progress_history(&self) -> Vec<(u8, String)> {
        self.data.lock().unwrap().progress_history.clone()
    }
}

#[async_trait]
impl PostgresClientTrait for MockPostgresClient {
    async fn get_job(&self, job_id: Uuid) -> Result<Option<JobRow>> {
        Ok(self.data.lock().unwrap().jobs.get(&job_id).cloned())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<RunRow>> {
        Ok(self.data.lock().unwrap().runs.get(&run_id).cloned())
    }

    async fn mark_job_started(&self, job_id: Uuid) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let job = data
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::storage("Job not found"))?;
        job.status = JobStatus::Processing.to_string();
        job.started_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn update_job_progress(
        &self,
        job_id: Uuid,
        progress_percent: u8,
        current_step: &str,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.progress_history
            .push((progress_percent, current_step.to_string()));
        let job = data
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::storage("Job not found"))?;
        job.progress_percent = i32::from(progress_percent);
        job.current_step = Some(current_step.to_string());
        Ok(())
    }

    async fn mark_job_completed(&self, job_id: Uuid) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let job = data
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::storage("Job not found"))?;
        job.status = JobStatus::Completed.to_string();
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_job_failed(&self, job_id: Uuid, error_message: &str) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let job = data
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::storage("Job not found"))?;
        job.status = JobStatus::Failed.to_string();
        job.error_message = Some(error_message.to_string());
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn update_run_status(&self, run_id: Uuid, status: RunStatus) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let run = data
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| Error::storage("Run not found"))?;
        run.status = status.to_string();
        if status.is_terminal() {
            run.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_run_total_questions(&self, run_id: Uuid, total: usize) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let run = data
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| Error::storage("Run not found"))?;
        run.total_questions = total as i32;
        Ok(())
    }

    async fn set_current_question(
        &self,
        run_id: Uuid,
        question_index: usize,
        question_id: Uuid,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let run = data
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| Error::storage("Run not found"))?;
        run.current_question_index = Some(question_index as i32);
        run.current_question_id = Some(question_id);
        Ok(())
    }

    async fn record_question_success(&self, run_id: Uuid) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let run = data
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| Error::storage("Run not found"))?;
        run.successful_questions += 1;
        Ok(())
    }

    async fn record_question_failure(&self, run_id: Uuid) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let run = data
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| Error::storage("Run not found"))?;
        run.failed_questions += 1;
        Ok(())
    }

    async fn finalize_run(
        &self,
        run_id: Uuid,
        average_scores: &AverageScores,
        statistics: &RunStatistics,
        processing_time_ms: u64,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let run = data
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| Error::storage("Run not found"))?;
        run.average_scores = Some(serde_json::to_value(average_scores).unwrap());
        run.statistics = Some(serde_json::to_value(statistics).unwrap());
        run.processing_time_ms = Some(processing_time_ms as i64);
        Ok(())
    }

    async fn get_questions(&self, dataset_id: Uuid) -> Result<Vec<QuestionRow>> {
        let data = self.data.lock().unwrap();
        let mut questions: Vec<QuestionRow> = data
            .questions
            .iter()
            .filter(|q| q.dataset_id == dataset_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn insert_result(&self, result: NewResult) -> Result<Uuid> {
        let mut data = self.data.lock().unwrap();

        // Mirror the (run_id, question_id) unique constraint
        if data
            .results
            .iter()
            .any(|r| r.run_id == result.run_id && r.question_id == result.question_id)
        {
            return Err(Error::storage(format!(
                "Duplicate result for run {} question {}",
                result.run_id, result.question_id
            )));
        }

        let result_id = Uuid::new_v4();
        let (precision, recall, relevancy) = result.score_columns();
        let (error_kind, error_message) = result.error_columns();
        let error_message = error_message.map(str::to_string);

        data.results.push(ResultRow {
            result_id,
            run_id: result.run_id,
            question_id: result.question_id,
            question: result.question,
            expected_context: result.expected_context,
            retrieved_contexts: serde_json::to_value(&result.retrieved_contexts).unwrap(),
            context_precision: precision,
            context_recall: recall,
            context_relevancy: relevancy,
            error_kind: error_kind.map(|k| k.as_str().to_string()),
            error_message,
            result_metadata: result.metadata,
            created_at: Utc::now(),
        });

        Ok(result_id)
    }

    async fn get_results_for_run(&self, run_id: Uuid) -> Result<Vec<ResultRow>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .results
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn claim_pending_job(&self) -> Result<Option<PendingEvaluation>> {
        let mut data = self.data.lock().unwrap();

        let pending = data
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending.to_string())
            .min_by_key(|j| j.created_at)
            .map(|j| j.job_id);

        let Some(job_id) = pending else {
            return Ok(None);
        };

        let run = data
            .runs
            .values()
            .find(|r| r.job_id == job_id)
            .cloned()
            .ok_or_else(|| Error::storage("Run not found for pending job"))?;

        let job = data.jobs.get_mut(&job_id).unwrap();
        job.status = JobStatus::Processing.to_string();
        job.started_at = Some(Utc::now());

        Ok(Some(PendingEvaluation {
            job_id,
            run_id: run.run_id,
            dataset_id: run.dataset_id,
            top_k: run.top_k,
        }))
    }
}
