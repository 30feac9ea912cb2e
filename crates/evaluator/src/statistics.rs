//! Aggregate statistics over a run's results

use ragmark_core::types::{AverageScores, Metric, MetricStats, RunStatistics};
use ragmark_storage::ResultRow;

fn score_of(row: &ResultRow, metric: Metric) -> Option<f64> {
    match metric {
        Metric::ContextPrecision => row.context_precision,
        Metric::ContextRecall => row.context_recall,
        Metric::ContextRelevancy => row.context_relevancy,
    }
}

/// Descriptive statistics for one metric's observations
///
/// Zero observations yield None; a single observation is its own mean
/// and median with zero deviation. Larger samples use the sample
/// standard deviation (n-1 divisor), consistent with the
/// single-observation case.
fn metric_stats(scores: &[f64]) -> Option<MetricStats> {
    match scores.len() {
        0 => None,
        1 => Some(MetricStats {
            mean: scores[0],
            median: scores[0],
            std_dev: 0.0,
            min: scores[0],
            max: scores[0],
            count: 1,
        }),
        n => {
            let mean = scores.iter().sum::<f64>() / n as f64;

            let mut sorted = scores.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = if n % 2 == 0 {
                (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
            } else {
                sorted[n / 2]
            };

            let variance =
                scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

            Some(MetricStats {
                mean,
                median,
                std_dev: variance.sqrt(),
                min: sorted[0],
                max: sorted[n - 1],
                count: n,
            })
        }
    }
}

/// Compute a run's aggregate scores and statistics
///
/// Only results carrying at least one score participate; nulls are
/// excluded per metric. Averages fall back to 0.0 for a metric with no
/// observations; that is a convention of the stored averages, not a
/// missing-data marker.
pub fn aggregate(results: &[ResultRow]) -> (AverageScores, RunStatistics) {
    let scored: Vec<&ResultRow> = results
        .iter()
        .filter(|r| {
            r.context_precision.is_some()
                || r.context_recall.is_some()
                || r.context_relevancy.is_some()
        })
        .collect();

    let mut averages = AverageScores::default();
    let mut statistics = RunStatistics::default();

    for metric in Metric::ALL {
        let scores: Vec<f64> = scored
            .iter()
            .filter_map(|r| score_of(r, metric))
            .collect();

        let average = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        averages.set(metric, average);
        statistics.set(metric, metric_stats(&scores));
    }

    (averages, statistics)
}
