//! Sanitization and parsing of judge model replies

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ScoreReply {
    score: f64,
}

/// Strip one layer of markdown code fencing from a reply
///
/// Some backends wrap JSON in ``` fences (with or without a language
/// tag) or single backticks; structured parsing runs on the unwrapped
/// text. Only one layer is removed.
pub(crate) fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start();
        let rest = match rest.strip_suffix("```") {
            Some(inner) => inner.trim_end(),
            None => rest,
        };
        return rest.trim().to_string();
    }

    if trimmed.len() >= 2 && trimmed.starts_with('`') && trimmed.ends_with('`') {
        return trimmed[1..trimmed.len() - 1].trim().to_string();
    }

    trimmed.to_string()
}

/// Extract the numeric score from a judge reply
///
/// Accepts a JSON object `{"score": x}` or a bare number. Anything
/// else, and any non-finite value, yields None; a missing score is
/// never coerced to 0.0.
pub(crate) fn parse_score(raw: &str) -> Option<f64> {
    let cleaned = strip_code_fences(raw);

    let value = if let Ok(reply) = serde_json::from_str::<ScoreReply>(&cleaned) {
        reply.score
    } else if let Ok(number) = cleaned.parse::<f64>() {
        number
    } else {
        return None;
    };

    value.is_finite().then_some(value)
}
