//! Error types for scoring operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Judge request failed: {0}")]
    Inference(String),

    #[error("Malformed judge response: {0}")]
    MalformedResponse(String),
}

impl From<ScoringError> for ragmark_core::error::Error {
    fn from(err: ScoringError) -> Self {
        ragmark_core::error::Error::Scoring(err.to_string())
    }
}
