//! Judge prompts for single-metric evaluation

use ragmark_core::types::{EvalSample, Metric};
use std::fmt::Write;

/// Build the judge prompt for one metric over one sample
///
/// Each prompt carries exactly one question and demands a strict-JSON
/// reply so the score can be extracted without free-text parsing.
pub(crate) fn judge_prompt(metric: Metric, sample: &EvalSample) -> String {
    let task = match metric {
        Metric::ContextPrecision => {
            "Judge what fraction of the retrieved contexts is actually useful for \
             answering the question, using the reference passage as ground truth. \
             Irrelevant or redundant contexts lower the score."
        }
        Metric::ContextRecall => {
            "Judge how much of the information in the reference passage is covered \
             by the retrieved contexts. Missing reference information lowers the \
             score."
        }
        Metric::ContextRelevancy => {
            "Judge how relevant the retrieved contexts are to the question itself, \
             independent of the reference passage. Off-topic contexts lower the \
             score."
        }
    };

    let mut contexts = String::new();
    if sample.contexts.is_empty() {
        contexts.push_str("(no contexts were retrieved)\n");
    } else {
        for (i, context) in sample.contexts.iter().enumerate() {
            let _ = writeln!(contexts, "[{}] {}", i + 1, context);
        }
    }

    format!(
        "You are evaluating the quality of a retrieval system.\n\n\
         {task}\n\n\
         Question:\n{question}\n\n\
         Retrieved contexts:\n{contexts}\n\
         Reference passage:\n{reference}\n\n\
         Respond with only a JSON object of the form \
         {{\"score\": <number between 0.0 and 1.0>}}. Do not include any \
         other text.",
        question = sample.question,
        reference = sample.expected_context,
    )
}
