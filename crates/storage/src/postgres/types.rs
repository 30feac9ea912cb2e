//! Row types for the evaluation schema

use chrono::{DateTime, Utc};
use ragmark_core::error::Result;
use ragmark_core::types::{FailureKind, JobStatus, ResultOutcome, ResultStatus, RunStatus};
use serde_json::Value;
use uuid::Uuid;

/// A row from `evaluation_jobs`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub job_id: Uuid,
    pub status: String,
    pub progress_percent: i32,
    pub current_step: Option<String>,
    pub created_by: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRow {
    pub fn job_status(&self) -> Result<JobStatus> {
        self.status.parse()
    }
}

/// A row from `evaluation_runs`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRow {
    pub run_id: Uuid,
    pub job_id: Uuid,
    pub dataset_id: Uuid,
    pub status: String,
    pub top_k: i32,
    pub total_questions: i32,
    pub successful_questions: i32,
    pub failed_questions: i32,
    pub current_question_index: Option<i32>,
    pub current_question_id: Option<Uuid>,
    pub average_scores: Option<Value>,
    pub statistics: Option<Value>,
    pub processing_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunRow {
    pub fn run_status(&self) -> Result<RunStatus> {
        self.status.parse()
    }
}

/// A row from `dataset_questions`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestionRow {
    pub question_id: Uuid,
    pub dataset_id: Uuid,
    pub question: String,
    pub expected_context: String,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

/// A row from `evaluation_results`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResultRow {
    pub result_id: Uuid,
    pub run_id: Uuid,
    pub question_id: Uuid,
    pub question: String,
    pub expected_context: String,
    pub retrieved_contexts: Value,
    pub context_precision: Option<f64>,
    pub context_recall: Option<f64>,
    pub context_relevancy: Option<f64>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub result_metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl ResultRow {
    /// Derive the result status from stored fields
    ///
    /// Status is never persisted: a result is failed if it carries an
    /// error classification, completed if any score is present, and
    /// pending otherwise.
    pub fn status(&self) -> ResultStatus {
        if self.error_kind.is_some() {
            ResultStatus::Failed
        } else if self.context_precision.is_some()
            || self.context_recall.is_some()
            || self.context_relevancy.is_some()
        {
            ResultStatus::Completed
        } else {
            ResultStatus::Pending
        }
    }

    /// Deserialize the stored contexts list
    pub fn contexts(&self) -> Vec<String> {
        serde_json::from_value(self.retrieved_contexts.clone()).unwrap_or_default()
    }
}

/// A new result row to append for a question
#[derive(Debug, Clone)]
pub struct NewResult {
    pub run_id: Uuid,
    pub question_id: Uuid,
    pub question: String,
    pub expected_context: String,
    pub retrieved_contexts: Vec<String>,
    pub outcome: ResultOutcome,
    pub metadata: Value,
}

impl NewResult {
    /// Score columns for this outcome (all None for failures)
    pub fn score_columns(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        match &self.outcome {
            ResultOutcome::Completed { scores } => (
                Some(scores.context_precision),
                Some(scores.context_recall),
                Some(scores.context_relevancy),
            ),
            ResultOutcome::Failed { .. } => (None, None, None),
        }
    }

    /// Error columns for this outcome (both None for completions)
    pub fn error_columns(&self) -> (Option<FailureKind>, Option<&str>) {
        match &self.outcome {
            ResultOutcome::Completed { .. } => (None, None),
            ResultOutcome::Failed { kind, message } => (Some(*kind), Some(message.as_str())),
        }
    }
}

/// A claimed unit of work for the evaluation worker
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingEvaluation {
    pub job_id: Uuid,
    pub run_id: Uuid,
    pub dataset_id: Uuid,
    pub top_k: i32,
}
