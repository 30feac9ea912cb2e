//! Domain types shared across the ragmark crates

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an evaluation job
///
/// Jobs move `pending -> processing -> {completed, failed}`. Terminal
/// states are final; whole-run retry is owned by the external work-queue
/// executor, not by this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Run status mirrors the owning job's status
pub type RunStatus = JobStatus;

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(Error::storage(format!("Invalid job status: {s}"))),
        }
    }
}

/// One of the three retrieval-quality metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ContextPrecision,
    ContextRecall,
    ContextRelevancy,
}

impl Metric {
    /// The fixed order metrics are scored in
    pub const ALL: [Metric; 3] = [
        Metric::ContextPrecision,
        Metric::ContextRecall,
        Metric::ContextRelevancy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContextPrecision => "context_precision",
            Self::ContextRecall => "context_recall",
            Self::ContextRelevancy => "context_relevancy",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One evaluation sample handed to the scoring engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalSample {
    pub question: String,
    pub contexts: Vec<String>,
    pub expected_context: String,
}

/// A fully-populated set of the three retrieval-quality scores
///
/// Construction validates that every score is finite and within [0, 1].
/// A partially-scored question never reaches this type: the scoring
/// engine either produces all three scores or raises.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub context_precision: f64,
    pub context_recall: f64,
    pub context_relevancy: f64,
}

impl ScoreSet {
    pub fn new(precision: f64, recall: f64, relevancy: f64) -> Result<Self> {
        for (metric, value) in [
            (Metric::ContextPrecision, precision),
            (Metric::ContextRecall, recall),
            (Metric::ContextRelevancy, relevancy),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::scoring(format!(
                    "Score for {metric} is not a finite value in [0, 1]: {value}"
                )));
            }
        }

        Ok(Self {
            context_precision: precision,
            context_recall: recall,
            context_relevancy: relevancy,
        })
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ContextPrecision => self.context_precision,
            Metric::ContextRecall => self.context_recall,
            Metric::ContextRelevancy => self.context_relevancy,
        }
    }
}

/// Classification of a recoverable per-question failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retrieval collaborator failed after retries were exhausted
    RetrievalError,
    /// Scoring failed, produced malformed output, or exhausted both backends
    EvaluationError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetrievalError => "retrieval_error",
            Self::EvaluationError => "evaluation_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "retrieval_error" => Ok(Self::RetrievalError),
            "evaluation_error" => Ok(Self::EvaluationError),
            _ => Err(Error::storage(format!("Invalid failure kind: {s}"))),
        }
    }
}

/// Outcome recorded when a question's result row is created
///
/// Results are append-only: the orchestrator writes exactly one outcome
/// per (run, question) and never revisits it.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultOutcome {
    Completed { scores: ScoreSet },
    Failed { kind: FailureKind, message: String },
}

/// Status derived from a stored result row, never persisted directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Descriptive statistics for one metric over a run's scored results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Per-metric statistics stored on a completed run
///
/// A metric with zero observations has no entry (the field is omitted
/// from the serialized form rather than zero-filled).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_precision: Option<MetricStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_recall: Option<MetricStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_relevancy: Option<MetricStats>,
}

impl RunStatistics {
    pub fn get(&self, metric: Metric) -> Option<&MetricStats> {
        match metric {
            Metric::ContextPrecision => self.context_precision.as_ref(),
            Metric::ContextRecall => self.context_recall.as_ref(),
            Metric::ContextRelevancy => self.context_relevancy.as_ref(),
        }
    }

    pub fn set(&mut self, metric: Metric, stats: Option<MetricStats>) {
        match metric {
            Metric::ContextPrecision => self.context_precision = stats,
            Metric::ContextRecall => self.context_recall = stats,
            Metric::ContextRelevancy => self.context_relevancy = stats,
        }
    }
}

/// Plain arithmetic mean per metric over a run's scored results
///
/// Zero observations for a metric yield 0.0 by convention. This is an
/// explicit convention of the stored averages, not a missing-data marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageScores {
    pub context_precision: f64,
    pub context_recall: f64,
    pub context_relevancy: f64,
}

impl AverageScores {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ContextPrecision => self.context_precision,
            Metric::ContextRecall => self.context_recall,
            Metric::ContextRelevancy => self.context_relevancy,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::ContextPrecision => self.context_precision = value,
            Metric::ContextRecall => self.context_recall = value,
            Metric::ContextRelevancy => self.context_relevancy = value,
        }
    }
}

/// Summary returned to the work-queue executor when a run finishes
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: JobStatus,
    pub total_questions: usize,
    pub successful_questions: usize,
    pub failed_questions: usize,
    pub average_scores: AverageScores,
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_job_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_job_status_rejects_unknown() {
        assert!("running".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_score_set_accepts_boundaries() {
        let scores = ScoreSet::new(0.0, 1.0, 0.5).unwrap();
        assert_eq!(scores.get(Metric::ContextPrecision), 0.0);
        assert_eq!(scores.get(Metric::ContextRecall), 1.0);
        assert_eq!(scores.get(Metric::ContextRelevancy), 0.5);
    }

    #[test]
    fn test_score_set_rejects_nan() {
        assert!(ScoreSet::new(f64::NAN, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_score_set_rejects_out_of_range() {
        assert!(ScoreSet::new(1.2, 0.5, 0.5).is_err());
        assert!(ScoreSet::new(0.5, -0.1, 0.5).is_err());
        assert!(ScoreSet::new(0.5, 0.5, f64::INFINITY).is_err());
    }

    #[test]
    fn test_failure_kind_strings() {
        assert_eq!(FailureKind::RetrievalError.as_str(), "retrieval_error");
        assert_eq!(FailureKind::EvaluationError.as_str(), "evaluation_error");
        let parsed: FailureKind = "retrieval_error".parse().unwrap();
        assert_eq!(parsed, FailureKind::RetrievalError);
    }

    #[test]
    fn test_metric_order_is_fixed() {
        assert_eq!(
            Metric::ALL,
            [
                Metric::ContextPrecision,
                Metric::ContextRecall,
                Metric::ContextRelevancy
            ]
        );
    }

    #[test]
    fn test_run_statistics_omits_empty_metrics() {
        let mut stats = RunStatistics::default();
        stats.set(
            Metric::ContextPrecision,
            Some(MetricStats {
                mean: 0.5,
                median: 0.5,
                std_dev: 0.0,
                min: 0.5,
                max: 0.5,
                count: 1,
            }),
        );

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("context_precision").is_some());
        assert!(json.get("context_recall").is_none());
        assert!(json.get("context_relevancy").is_none());
    }
}
