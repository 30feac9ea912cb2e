//! Integration tests for the evaluation orchestrator
//!
//! These drive full runs against in-memory collaborators: the storage
//! mock, a scripted retrieval client, and a scripted scoring engine.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use ragmark_core::error::{Error, Result as CoreResult};
use ragmark_core::types::{EvalSample, JobStatus, ResultOutcome, ResultStatus, ScoreSet};
use ragmark_evaluator::Evaluator;
use ragmark_retrieval::MockRetrievalClient;
use ragmark_scoring::ScoreEngine;
use ragmark_storage::{MockPostgresClient, NewResult, PostgresClientTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Scoring engine that replays scripted outcomes and records its inputs
#[derive(Default)]
struct ScriptedEngine {
    replies: Mutex<VecDeque<Result<ScoreSet, String>>>,
    samples: Mutex<Vec<EvalSample>>,
}

impl ScriptedEngine {
    fn push_scores(&self, precision: f64, recall: f64, relevancy: f64) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(ScoreSet::new(precision, recall, relevancy).unwrap()));
    }

    fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    fn samples(&self) -> Vec<EvalSample> {
        self.samples.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoreEngine for ScriptedEngine {
    async fn score(&self, sample: &EvalSample) -> CoreResult<ScoreSet> {
        self.samples.lock().unwrap().push(sample.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(scores)) => Ok(scores),
            Some(Err(message)) => Err(Error::scoring(message)),
            None => Err(Error::scoring("ScriptedEngine: no scripted reply")),
        }
    }
}

struct Fixture {
    postgres: Arc<MockPostgresClient>,
    retrieval: Arc<MockRetrievalClient>,
    engine: Arc<ScriptedEngine>,
    evaluator: Evaluator,
    job_id: Uuid,
    run_id: Uuid,
    dataset_id: Uuid,
}

/// Seed a pending job/run pair and build an evaluator over mocks
fn fixture() -> Fixture {
    let postgres = Arc::new(MockPostgresClient::new());
    let retrieval = Arc::new(MockRetrievalClient::new());
    let engine = Arc::new(ScriptedEngine::default());

    let job_id = Uuid::new_v4();
    let run_id = Uuid::new_v4();
    let dataset_id = Uuid::new_v4();
    postgres.seed_job(job_id);
    postgres.seed_run(run_id, job_id, dataset_id, 5);

    let evaluator = Evaluator::new(
        postgres.clone() as Arc<dyn PostgresClientTrait>,
        retrieval.clone(),
        engine.clone(),
    );

    Fixture {
        postgres,
        retrieval,
        engine,
        evaluator,
        job_id,
        run_id,
        dataset_id,
    }
}

fn assert_progress_well_formed(history: &[(u8, String)]) {
    let mut last = 0u8;
    for (percent, step) in history {
        assert!(*percent <= 100, "progress {percent} out of range ({step})");
        assert!(
            *percent >= last,
            "progress went backwards: {last} -> {percent} ({step})"
        );
        last = *percent;
    }
}

#[tokio::test]
async fn test_happy_path_scores_every_question() {
    let f = fixture();

    for i in 0..3 {
        f.postgres.seed_question(
            f.dataset_id,
            i,
            &format!("question {i}"),
            &format!("expected context {i}"),
        );
        f.retrieval
            .push_success(vec![format!("passage for {i}"), "filler".to_string()]);
        f.engine.push_scores(0.75, 0.5, 0.25);
    }

    let summary = f
        .evaluator
        .start_evaluation(f.job_id, f.run_id, f.dataset_id, 5)
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.total_questions, 3);
    assert_eq!(summary.successful_questions, 3);
    assert_eq!(summary.failed_questions, 0);
    assert_eq!(summary.average_scores.context_precision, 0.75);
    assert_eq!(summary.average_scores.context_recall, 0.5);
    assert_eq!(summary.average_scores.context_relevancy, 0.25);

    let job = f.postgres.job(f.job_id).unwrap();
    assert_eq!(job.status, "completed");
    assert_eq!(job.progress_percent, 100);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());

    let run = f.postgres.run(f.run_id).unwrap();
    assert_eq!(run.status, "completed");
    assert_eq!(run.total_questions, 3);
    assert_eq!(run.successful_questions, 3);
    assert_eq!(run.failed_questions, 0);
    assert!(run.average_scores.is_some());
    assert!(run.statistics.is_some());
    assert!(run.processing_time_ms.is_some());

    let results = f.postgres.results();
    assert_eq!(results.len(), 3);
    for result in &results {
        assert_eq!(result.status(), ResultStatus::Completed);
        assert_eq!(result.contexts().len(), 2);
    }

    // Questions are processed in order_index order
    let questions: Vec<String> = results.iter().map(|r| r.question.clone()).collect();
    assert_eq!(questions, vec!["question 0", "question 1", "question 2"]);

    assert_progress_well_formed(&f.postgres.progress_history());
    let steps: Vec<String> = f
        .postgres
        .progress_history()
        .iter()
        .map(|(_, step)| step.clone())
        .collect();
    assert!(steps.contains(&"Testing question 1/3...".to_string()));
    assert!(steps.contains(&"Evaluation completed successfully".to_string()));
}

#[tokio::test]
async fn test_engine_receives_retrieved_contexts() {
    let f = fixture();
    f.postgres
        .seed_question(f.dataset_id, 0, "the question", "the reference");
    f.retrieval
        .push_success(vec!["first".to_string(), "second".to_string()]);
    f.engine.push_scores(0.5, 0.5, 0.5);

    f.evaluator
        .start_evaluation(f.job_id, f.run_id, f.dataset_id, 7)
        .await
        .unwrap();

    let samples = f.engine.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].question, "the question");
    assert_eq!(samples[0].contexts, vec!["first", "second"]);
    assert_eq!(samples[0].expected_context, "the reference");

    // top_k flows through to the retrieval call unchanged
    assert_eq!(f.retrieval.queries(), vec![("the question".to_string(), 7)]);
}

#[tokio::test]
async fn test_retrieval_failure_is_isolated_to_its_question() {
    let f = fixture();
    f.postgres.seed_question(f.dataset_id, 0, "q0", "e0");
    f.postgres.seed_question(f.dataset_id, 1, "q1", "e1");

    // Question 0 exhausts its retries; question 1 succeeds
    f.retrieval.push_failure("connection refused after 3 attempts");
    f.retrieval.push_success(vec!["passage".to_string()]);
    f.engine.push_scores(0.6, 0.6, 0.6);

    let summary = f
        .evaluator
        .start_evaluation(f.job_id, f.run_id, f.dataset_id, 5)
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.successful_questions, 1);
    assert_eq!(summary.failed_questions, 1);
    assert_eq!(
        summary.successful_questions + summary.failed_questions,
        summary.total_questions
    );

    let results = f.postgres.results();
    assert_eq!(results.len(), 2);

    let failed = &results[0];
    assert_eq!(failed.question, "q0");
    assert_eq!(failed.status(), ResultStatus::Failed);
    assert_eq!(failed.error_kind.as_deref(), Some("retrieval_error"));
    // Nothing was retrieved, so no contexts are stored
    assert!(failed.contexts().is_empty());
    assert!(failed.context_precision.is_none());

    let succeeded = &results[1];
    assert_eq!(succeeded.question, "q1");
    assert_eq!(succeeded.status(), ResultStatus::Completed);

    // The engine never saw the failed question
    assert_eq!(f.engine.samples().len(), 1);
    assert_eq!(f.engine.samples()[0].question, "q1");
}

#[tokio::test]
async fn test_scoring_failure_preserves_contexts() {
    let f = fixture();
    f.postgres.seed_question(f.dataset_id, 0, "q0", "e0");
    f.retrieval
        .push_success(vec!["kept one".to_string(), "kept two".to_string()]);
    f.engine.push_failure("both backends exhausted");

    let summary = f
        .evaluator
        .start_evaluation(f.job_id, f.run_id, f.dataset_id, 5)
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.failed_questions, 1);

    let results = f.postgres.results();
    let failed = &results[0];
    assert_eq!(failed.status(), ResultStatus::Failed);
    assert_eq!(failed.error_kind.as_deref(), Some("evaluation_error"));
    // Contexts survive scoring failures for debugging
    assert_eq!(failed.contexts(), vec!["kept one", "kept two"]);
    assert_eq!(failed.result_metadata["contexts_retrieved"], 2);
}

#[tokio::test]
async fn test_total_scoring_failure_still_completes_the_run() {
    let f = fixture();
    f.postgres.seed_question(f.dataset_id, 0, "q0", "e0");
    f.postgres.seed_question(f.dataset_id, 1, "q1", "e1");
    f.retrieval.push_success(vec!["ctx".to_string()]);
    f.retrieval.push_success(vec!["ctx".to_string()]);
    f.engine.push_failure("judge unreachable");
    f.engine.push_failure("judge unreachable");

    let summary = f
        .evaluator
        .start_evaluation(f.job_id, f.run_id, f.dataset_id, 5)
        .await
        .unwrap();

    // Partial question failure is not a job failure, even when total
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.successful_questions, 0);
    assert_eq!(summary.failed_questions, 2);
    assert_eq!(summary.average_scores.context_precision, 0.0);
    assert_eq!(summary.average_scores.context_recall, 0.0);
    assert_eq!(summary.average_scores.context_relevancy, 0.0);

    let job = f.postgres.job(f.job_id).unwrap();
    assert_eq!(job.status, "completed");

    // No metric has observations, so the statistics blob is empty
    let run = f.postgres.run(f.run_id).unwrap();
    assert_eq!(run.statistics.unwrap(), serde_json::json!({}));

    assert_progress_well_formed(&f.postgres.progress_history());
}

#[tokio::test]
async fn test_invalid_top_k_is_fatal() {
    let f = fixture();
    f.postgres.seed_question(f.dataset_id, 0, "q0", "e0");

    let err = f
        .evaluator
        .start_evaluation(f.job_id, f.run_id, f.dataset_id, 0)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("top_k"));

    let job = f.postgres.job(f.job_id).unwrap();
    assert_eq!(job.status, "failed");
    assert!(job.error_message.unwrap().contains("top_k"));
}

#[tokio::test]
async fn test_missing_run_is_fatal() {
    let postgres = Arc::new(MockPostgresClient::new());
    let retrieval = Arc::new(MockRetrievalClient::new());
    let engine = Arc::new(ScriptedEngine::default());

    let job_id = Uuid::new_v4();
    postgres.seed_job(job_id);
    // No run is seeded

    let evaluator = Evaluator::new(
        postgres.clone() as Arc<dyn PostgresClientTrait>,
        retrieval,
        engine,
    );

    let err = evaluator
        .start_evaluation(job_id, Uuid::new_v4(), Uuid::new_v4(), 5)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"));

    let job = postgres.job(job_id).unwrap();
    assert_eq!(job.status, "failed");
    assert!(job.error_message.is_some());
}

#[tokio::test]
async fn test_empty_dataset_is_fatal() {
    let f = fixture();

    let err = f
        .evaluator
        .start_evaluation(f.job_id, f.run_id, f.dataset_id, 5)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no questions"));

    let job = f.postgres.job(f.job_id).unwrap();
    assert_eq!(job.status, "failed");
    assert!(f.postgres.results().is_empty());
}

#[tokio::test]
async fn test_duplicate_results_are_rejected_by_storage() {
    let postgres = MockPostgresClient::new();
    let run_id = Uuid::new_v4();
    let question_id = Uuid::new_v4();

    let result = NewResult {
        run_id,
        question_id,
        question: "q".to_string(),
        expected_context: "e".to_string(),
        retrieved_contexts: vec![],
        outcome: ResultOutcome::Completed {
            scores: ScoreSet::new(0.5, 0.5, 0.5).unwrap(),
        },
        metadata: serde_json::json!({}),
    };

    postgres.insert_result(result.clone()).await.unwrap();
    let err = postgres.insert_result(result).await.unwrap_err();
    assert!(err.to_string().contains("Duplicate result"));
}

#[tokio::test]
async fn test_mixed_outcomes_average_over_scored_results_only() {
    let f = fixture();
    f.postgres.seed_question(f.dataset_id, 0, "q0", "e0");
    f.postgres.seed_question(f.dataset_id, 1, "q1", "e1");
    f.postgres.seed_question(f.dataset_id, 2, "q2", "e2");

    f.retrieval.push_success(vec!["ctx".to_string()]);
    f.retrieval.push_failure("retrieval down");
    f.retrieval.push_success(vec!["ctx".to_string()]);
    f.engine.push_scores(1.0, 1.0, 1.0);
    f.engine.push_scores(0.0, 0.5, 1.0);

    let summary = f
        .evaluator
        .start_evaluation(f.job_id, f.run_id, f.dataset_id, 5)
        .await
        .unwrap();

    assert_eq!(summary.successful_questions, 2);
    assert_eq!(summary.failed_questions, 1);
    // Failed results carry no scores and are excluded from averages
    assert_eq!(summary.average_scores.context_precision, 0.5);
    assert_eq!(summary.average_scores.context_recall, 0.75);
    assert_eq!(summary.average_scores.context_relevancy, 1.0);
}
