//! Sequential metric scoring engine with primary/fallback switching

use crate::backend::BackendProvider;
use crate::response::parse_score;
use crate::ScoreEngine;
use async_trait::async_trait;
use ragmark_core::error::{Error, Result};
use ragmark_core::types::{EvalSample, Metric, ScoreSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scores produced so far within one backend pass
#[derive(Debug, Default, Clone, Copy)]
struct PartialScores {
    precision: Option<f64>,
    recall: Option<f64>,
    relevancy: Option<f64>,
}

impl PartialScores {
    fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::ContextPrecision => self.precision = Some(value),
            Metric::ContextRecall => self.recall = Some(value),
            Metric::ContextRelevancy => self.relevancy = Some(value),
        }
    }

    fn is_complete(&self) -> bool {
        self.precision.is_some() && self.recall.is_some() && self.relevancy.is_some()
    }

    fn unset_metrics(&self) -> Vec<Metric> {
        let mut unset = Vec::new();
        if self.precision.is_none() {
            unset.push(Metric::ContextPrecision);
        }
        if self.recall.is_none() {
            unset.push(Metric::ContextRecall);
        }
        if self.relevancy.is_none() {
            unset.push(Metric::ContextRelevancy);
        }
        unset
    }

    fn into_score_set(self) -> Result<ScoreSet> {
        match (self.precision, self.recall, self.relevancy) {
            (Some(precision), Some(recall), Some(relevancy)) => {
                ScoreSet::new(precision, recall, relevancy)
            }
            _ => Err(Error::scoring(format!(
                "Incomplete score set: unset metrics {:?}",
                self.unset_metrics()
            ))),
        }
    }
}

/// Scoring engine that computes the three metrics strictly one at a time
///
/// Metrics are never scored concurrently: running all three against one
/// model-serving backend at once exhausts its memory. Each metric call
/// acquires a fresh backend handle and releases it when the call
/// finishes, so no execution context is reused between metrics.
pub struct MetricScorer {
    backends: Arc<dyn BackendProvider>,
}

impl MetricScorer {
    pub fn new(backends: Arc<dyn BackendProvider>) -> Self {
        Self { backends }
    }

    /// Run the full three-metric sequence against one tier
    ///
    /// A metric whose judgement fails or yields no usable score is left
    /// unset; the sequence always continues to the next metric.
    async fn score_all_metrics(
        &self,
        tier: crate::BackendTier,
        sample: &EvalSample,
    ) -> Result<PartialScores> {
        let mut partial = PartialScores::default();

        for metric in Metric::ALL {
            // Fresh handle per metric; the previous handle was dropped at
            // the end of the prior iteration, before this acquire.
            let backend = self.backends.acquire(tier).await?;

            match backend.judge(metric, sample).await {
                Ok(raw) => match parse_score(&raw) {
                    Some(value) if (0.0..=1.0).contains(&value) => {
                        debug!("{metric} = {value:.3} on {tier} backend");
                        partial.set(metric, value);
                    }
                    Some(value) => {
                        warn!("{metric} out of range on {tier} backend ({value}), leaving unset");
                    }
                    None => {
                        warn!("{metric} reply carried no usable score on {tier} backend, leaving unset");
                    }
                },
                Err(e) => {
                    warn!("{metric} judgement failed on {tier} backend: {e}, leaving unset");
                }
            }
        }

        Ok(partial)
    }
}

#[async_trait]
impl ScoreEngine for MetricScorer {
    async fn score(&self, sample: &EvalSample) -> Result<ScoreSet> {
        let primary = self.backends.primary_tier();
        let partial = self.score_all_metrics(primary, sample).await?;

        if partial.is_complete() {
            return partial.into_score_set();
        }

        // Partial scores from the primary pass are discarded wholesale;
        // the fallback reruns the full metric sequence from scratch.
        let Some(fallback) = self.backends.fallback_tier() else {
            return Err(Error::scoring(format!(
                "Scoring incomplete on {primary} backend with no fallback configured: \
                 unset metrics {:?}",
                partial.unset_metrics()
            )));
        };

        info!(
            "Scoring incomplete on {primary} backend (unset {:?}), retrying on {fallback} backend",
            partial.unset_metrics()
        );

        let partial = self.score_all_metrics(fallback, sample).await?;
        if partial.is_complete() {
            partial.into_score_set()
        } else {
            Err(Error::scoring(format!(
                "Scoring incomplete on both {primary} and {fallback} backends: \
                 unset metrics {:?}",
                partial.unset_metrics()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendTier, ScoringBackend};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend that replays one scripted reply per judgement
    struct ScriptedBackend {
        tier: BackendTier,
        reply: std::result::Result<String, String>,
    }

    #[async_trait]
    impl ScoringBackend for ScriptedBackend {
        fn tier(&self) -> BackendTier {
            self.tier
        }

        async fn judge(&self, _metric: Metric, _sample: &EvalSample) -> Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(Error::scoring(message.clone())),
            }
        }
    }

    /// Provider handing out scripted backends and recording acquisitions
    struct ScriptedProvider {
        primary: BackendTier,
        fallback: Option<BackendTier>,
        cloud_replies: Mutex<VecDeque<std::result::Result<String, String>>>,
        local_replies: Mutex<VecDeque<std::result::Result<String, String>>>,
        acquisitions: Mutex<Vec<BackendTier>>,
    }

    impl ScriptedProvider {
        fn with_fallback() -> Self {
            Self {
                primary: BackendTier::Cloud,
                fallback: Some(BackendTier::Local),
                cloud_replies: Mutex::new(VecDeque::new()),
                local_replies: Mutex::new(VecDeque::new()),
                acquisitions: Mutex::new(Vec::new()),
            }
        }

        fn local_only() -> Self {
            Self {
                primary: BackendTier::Local,
                fallback: None,
                cloud_replies: Mutex::new(VecDeque::new()),
                local_replies: Mutex::new(VecDeque::new()),
                acquisitions: Mutex::new(Vec::new()),
            }
        }

        fn queue(&self, tier: BackendTier, reply: std::result::Result<&str, &str>) {
            let reply = match reply {
                Ok(text) => Ok(text.to_string()),
                Err(message) => Err(message.to_string()),
            };
            match tier {
                BackendTier::Cloud => self.cloud_replies.lock().unwrap().push_back(reply),
                BackendTier::Local => self.local_replies.lock().unwrap().push_back(reply),
            }
        }

        fn acquisitions(&self) -> Vec<BackendTier> {
            self.acquisitions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackendProvider for ScriptedProvider {
        fn primary_tier(&self) -> BackendTier {
            self.primary
        }

        fn fallback_tier(&self) -> Option<BackendTier> {
            self.fallback
        }

        async fn acquire(&self, tier: BackendTier) -> Result<Box<dyn ScoringBackend>> {
            self.acquisitions.lock().unwrap().push(tier);
            let reply = match tier {
                BackendTier::Cloud => self.cloud_replies.lock().unwrap().pop_front(),
                BackendTier::Local => self.local_replies.lock().unwrap().pop_front(),
            }
            .unwrap_or(Err("no scripted reply".to_string()));
            Ok(Box::new(ScriptedBackend { tier, reply }))
        }
    }

    fn sample() -> EvalSample {
        EvalSample {
            question: "When are refunds issued?".to_string(),
            contexts: vec!["Refunds are issued within 30 days.".to_string()],
            expected_context: "Refunds are issued within 30 days of purchase.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_complete_primary_pass() {
        let provider = Arc::new(ScriptedProvider::with_fallback());
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.9}"));
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.8}"));
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.7}"));

        let scorer = MetricScorer::new(provider.clone());
        let scores = scorer.score(&sample()).await.unwrap();

        assert_eq!(scores.context_precision, 0.9);
        assert_eq!(scores.context_recall, 0.8);
        assert_eq!(scores.context_relevancy, 0.7);
        // One fresh handle per metric, all on the primary tier
        assert_eq!(provider.acquisitions(), vec![BackendTier::Cloud; 3]);
    }

    #[tokio::test]
    async fn test_fallback_recovers_unusable_primary_scores() {
        let provider = Arc::new(ScriptedProvider::with_fallback());
        // Primary produces one usable score and two unusable replies
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.9}"));
        provider.queue(BackendTier::Cloud, Ok("NaN"));
        provider.queue(BackendTier::Cloud, Ok("no json here"));
        // Fallback succeeds across the board
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.5}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.6}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.4}"));

        let scorer = MetricScorer::new(provider.clone());
        let scores = scorer.score(&sample()).await.unwrap();

        // The usable primary score was discarded with the rest of the pass
        assert_eq!(scores.context_precision, 0.5);
        assert_eq!(scores.context_recall, 0.6);
        assert_eq!(scores.context_relevancy, 0.4);
        assert_eq!(
            provider.acquisitions(),
            vec![
                BackendTier::Cloud,
                BackendTier::Cloud,
                BackendTier::Cloud,
                BackendTier::Local,
                BackendTier::Local,
                BackendTier::Local,
            ]
        );
    }

    #[tokio::test]
    async fn test_fenced_replies_are_parsed() {
        let provider = Arc::new(ScriptedProvider::with_fallback());
        provider.queue(BackendTier::Cloud, Ok("```json\n{\"score\": 0.9}\n```"));
        provider.queue(BackendTier::Cloud, Ok("```\n{\"score\": 0.8}\n```"));
        provider.queue(BackendTier::Cloud, Ok("`{\"score\": 0.7}`"));

        let scorer = MetricScorer::new(provider.clone());
        let scores = scorer.score(&sample()).await.unwrap();

        assert_eq!(scores.context_precision, 0.9);
        assert_eq!(scores.context_recall, 0.8);
        assert_eq!(scores.context_relevancy, 0.7);
    }

    #[tokio::test]
    async fn test_out_of_range_score_forces_fallback() {
        let provider = Arc::new(ScriptedProvider::with_fallback());
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 1.5}"));
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.8}"));
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.7}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.1}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.2}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.3}"));

        let scorer = MetricScorer::new(provider.clone());
        let scores = scorer.score(&sample()).await.unwrap();

        assert_eq!(scores.context_precision, 0.1);
    }

    #[tokio::test]
    async fn test_judgement_errors_do_not_abort_the_pass() {
        let provider = Arc::new(ScriptedProvider::with_fallback());
        provider.queue(BackendTier::Cloud, Err("model overloaded"));
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.8}"));
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.7}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.5}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.6}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.4}"));

        let scorer = MetricScorer::new(provider.clone());
        let scores = scorer.score(&sample()).await.unwrap();

        // All three cloud metrics ran despite the first failing, then the
        // fallback produced the final set
        assert_eq!(provider.acquisitions().len(), 6);
        assert_eq!(scores.context_recall, 0.6);
    }

    #[tokio::test]
    async fn test_fallback_is_not_sticky_across_questions() {
        let provider = Arc::new(ScriptedProvider::with_fallback());
        // First question falls back to local
        provider.queue(BackendTier::Cloud, Ok("NaN"));
        provider.queue(BackendTier::Cloud, Ok("NaN"));
        provider.queue(BackendTier::Cloud, Ok("NaN"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.5}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.5}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.5}"));
        // Second question succeeds on the primary again
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.9}"));
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.9}"));
        provider.queue(BackendTier::Cloud, Ok("{\"score\": 0.9}"));

        let scorer = MetricScorer::new(provider.clone());
        scorer.score(&sample()).await.unwrap();
        scorer.score(&sample()).await.unwrap();

        // The second invocation started back on the primary tier
        assert_eq!(
            provider.acquisitions()[6..],
            [BackendTier::Cloud, BackendTier::Cloud, BackendTier::Cloud]
        );
    }

    #[tokio::test]
    async fn test_local_primary_has_no_fallback() {
        let provider = Arc::new(ScriptedProvider::local_only());
        provider.queue(BackendTier::Local, Ok("not a score"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.8}"));
        provider.queue(BackendTier::Local, Ok("{\"score\": 0.7}"));

        let scorer = MetricScorer::new(provider.clone());
        let err = scorer.score(&sample()).await.unwrap_err();

        assert!(err.to_string().contains("no fallback"));
        assert_eq!(provider.acquisitions(), vec![BackendTier::Local; 3]);
    }

    #[tokio::test]
    async fn test_both_tiers_failing_is_terminal() {
        let provider = Arc::new(ScriptedProvider::with_fallback());
        for _ in 0..3 {
            provider.queue(BackendTier::Cloud, Ok("NaN"));
            provider.queue(BackendTier::Local, Err("connection refused"));
        }

        let scorer = MetricScorer::new(provider.clone());
        let err = scorer.score(&sample()).await.unwrap_err();

        assert!(err.to_string().contains("both"));
        assert_eq!(provider.acquisitions().len(), 6);
    }
}
