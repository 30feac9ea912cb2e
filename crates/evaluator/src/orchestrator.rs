//! Evaluation orchestrator: drives one run from pending to terminal

use crate::progress::ProgressPublisher;
use crate::statistics;
use ragmark_core::error::{Error, Result};
use ragmark_core::types::{
    EvalSample, FailureKind, JobStatus, ResultOutcome, RunStatus, RunSummary,
};
use ragmark_retrieval::RetrievalClient;
use ragmark_scoring::ScoreEngine;
use ragmark_storage::{NewResult, PostgresClientTrait, QuestionRow};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Orchestrates evaluation runs
///
/// One instance processes one run at a time, strictly sequentially: no
/// two questions of the same run are ever retrieved or scored
/// concurrently. This is a correctness requirement of the scoring
/// backend's resource limits, not an incidental simplification.
pub struct Evaluator {
    postgres: Arc<dyn PostgresClientTrait>,
    retrieval: Arc<dyn RetrievalClient>,
    engine: Arc<dyn ScoreEngine>,
    progress: ProgressPublisher,
}

impl Evaluator {
    pub fn new(
        postgres: Arc<dyn PostgresClientTrait>,
        retrieval: Arc<dyn RetrievalClient>,
        engine: Arc<dyn ScoreEngine>,
    ) -> Self {
        let progress = ProgressPublisher::new(Arc::clone(&postgres));
        Self {
            postgres,
            retrieval,
            engine,
            progress,
        }
    }

    /// Progress reader for this evaluator's cache
    pub fn progress(&self) -> &ProgressPublisher {
        &self.progress
    }

    /// Drive one evaluation run from pending to a terminal state
    ///
    /// Per-question retrieval and scoring failures are recorded as failed
    /// results and never abort the run. Failures outside the question
    /// loop mark the job failed and propagate to the caller, which owns
    /// whole-run retry.
    pub async fn start_evaluation(
        &self,
        job_id: Uuid,
        run_id: Uuid,
        dataset_id: Uuid,
        top_k: usize,
    ) -> Result<RunSummary> {
        info!("Starting evaluation for job {job_id}, run {run_id}, dataset {dataset_id}");

        match self.run_evaluation(job_id, run_id, dataset_id, top_k).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("Evaluation job {job_id} failed: {e}");

                // Best effort: the original failure is what propagates
                if let Err(mark_err) = self.postgres.mark_job_failed(job_id, &e.to_string()).await
                {
                    error!("Failed to mark job {job_id} failed: {mark_err}");
                }
                if let Err(mark_err) = self
                    .postgres
                    .update_run_status(run_id, RunStatus::Failed)
                    .await
                {
                    error!("Failed to mark run {run_id} failed: {mark_err}");
                }

                Err(e)
            }
        }
    }

    async fn run_evaluation(
        &self,
        job_id: Uuid,
        run_id: Uuid,
        dataset_id: Uuid,
        top_k: usize,
    ) -> Result<RunSummary> {
        let started = Instant::now();

        if !(1..=20).contains(&top_k) {
            return Err(Error::invalid_input(format!(
                "top_k must be within [1, 20], got {top_k}"
            )));
        }

        self.postgres
            .get_job(job_id)
            .await?
            .ok_or_else(|| Error::invalid_input(format!("Job {job_id} not found")))?;
        self.postgres
            .get_run(run_id)
            .await?
            .ok_or_else(|| Error::invalid_input(format!("Run {run_id} not found")))?;

        self.postgres.mark_job_started(job_id).await?;
        self.postgres
            .update_run_status(run_id, RunStatus::Processing)
            .await?;
        self.progress.publish(job_id, 5, "Loading questions...").await?;

        // Ordered by order_index; the ordering defines the processing sequence
        let questions = self.postgres.get_questions(dataset_id).await?;
        if questions.is_empty() {
            return Err(Error::invalid_input(format!(
                "Dataset {dataset_id} has no questions"
            )));
        }

        let total = questions.len();
        self.postgres.set_run_total_questions(run_id, total).await?;

        info!("Processing {total} questions sequentially");
        self.progress
            .publish(
                job_id,
                10,
                &format!("Starting evaluation of {total} questions..."),
            )
            .await?;

        let mut successful = 0usize;
        let mut failed = 0usize;

        for (index, question) in questions.iter().enumerate() {
            let question_num = index + 1;
            // Progress spans 10-90% across the question loop
            let percent = (10 + (80 * index) / total) as u8;

            self.postgres
                .set_current_question(run_id, index, question.question_id)
                .await?;
            self.progress
                .publish(
                    job_id,
                    percent,
                    &format!("Testing question {question_num}/{total}..."),
                )
                .await?;

            info!("Processing question {question_num}/{total}");

            if self.evaluate_question(run_id, question, top_k).await? {
                successful += 1;
            } else {
                failed += 1;
            }
        }

        self.progress
            .publish(job_id, 90, "Calculating statistics...")
            .await?;

        let results = self.postgres.get_results_for_run(run_id).await?;
        let (average_scores, run_statistics) = statistics::aggregate(&results);
        let processing_time_ms = started.elapsed().as_millis() as u64;

        self.postgres
            .finalize_run(run_id, &average_scores, &run_statistics, processing_time_ms)
            .await?;
        self.postgres
            .update_run_status(run_id, RunStatus::Completed)
            .await?;
        self.postgres.mark_job_completed(job_id).await?;
        self.progress
            .publish(job_id, 100, "Evaluation completed successfully")
            .await?;

        info!("Evaluation completed: {successful} succeeded, {failed} failed");

        Ok(RunSummary {
            status: JobStatus::Completed,
            total_questions: total,
            successful_questions: successful,
            failed_questions: failed,
            average_scores,
            processing_time_ms,
        })
    }

    /// Evaluate one question and record its result row
    ///
    /// Returns whether the question succeeded. Only persistence failures
    /// propagate out of here; retrieval and scoring failures become
    /// failed results and the loop continues.
    async fn evaluate_question(
        &self,
        run_id: Uuid,
        question: &QuestionRow,
        top_k: usize,
    ) -> Result<bool> {
        let retrieval = match self.retrieval.query(&question.question, top_k).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                error!(
                    "Retrieval failed for question {}: {e}",
                    question.question_id
                );

                // Nothing was retrieved, so the result carries no contexts
                self.postgres
                    .insert_result(NewResult {
                        run_id,
                        question_id: question.question_id,
                        question: question.question.clone(),
                        expected_context: question.expected_context.clone(),
                        retrieved_contexts: Vec::new(),
                        outcome: ResultOutcome::Failed {
                            kind: FailureKind::RetrievalError,
                            message: format!("Retrieval service error: {e}"),
                        },
                        metadata: serde_json::json!({ "top_k": top_k }),
                    })
                    .await?;
                self.postgres.record_question_failure(run_id).await?;
                return Ok(false);
            }
        };

        debug!(
            "Retrieved {} contexts in {}ms",
            retrieval.contexts.len(),
            retrieval.retrieval_time_ms
        );

        let sample = EvalSample {
            question: question.question.clone(),
            contexts: retrieval.contexts.clone(),
            expected_context: question.expected_context.clone(),
        };

        let scoring_started = Instant::now();
        match self.engine.score(&sample).await {
            Ok(scores) => {
                let evaluation_time_ms = scoring_started.elapsed().as_millis() as u64;

                self.postgres
                    .insert_result(NewResult {
                        run_id,
                        question_id: question.question_id,
                        question: question.question.clone(),
                        expected_context: question.expected_context.clone(),
                        retrieved_contexts: retrieval.contexts,
                        outcome: ResultOutcome::Completed { scores },
                        metadata: serde_json::json!({
                            "retrieval_time_ms": retrieval.retrieval_time_ms,
                            "evaluation_time_ms": evaluation_time_ms,
                            "total_time_ms": retrieval.retrieval_time_ms + evaluation_time_ms,
                            "cache_hit": retrieval.cached,
                            "top_k": top_k,
                        }),
                    })
                    .await?;
                self.postgres.record_question_success(run_id).await?;
                Ok(true)
            }
            Err(e) => {
                error!("Scoring failed for question {}: {e}", question.question_id);

                // Contexts are preserved on scoring failures for debugging
                self.postgres
                    .insert_result(NewResult {
                        run_id,
                        question_id: question.question_id,
                        question: question.question.clone(),
                        expected_context: question.expected_context.clone(),
                        retrieved_contexts: retrieval.contexts.clone(),
                        outcome: ResultOutcome::Failed {
                            kind: FailureKind::EvaluationError,
                            message: format!("Evaluation error: {e}"),
                        },
                        metadata: serde_json::json!({
                            "retrieval_time_ms": retrieval.retrieval_time_ms,
                            "contexts_retrieved": retrieval.contexts.len(),
                            "top_k": top_k,
                        }),
                    })
                    .await?;
                self.postgres.record_question_failure(run_id).await?;
                Ok(false)
            }
        }
    }
}
