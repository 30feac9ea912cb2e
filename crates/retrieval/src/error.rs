//! Error types for retrieval operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Retrieval service timeout: {0}")]
    Timeout(String),

    #[error("Failed to connect to retrieval service: {0}")]
    Connection(String),

    #[error("Retrieval service returned error {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Invalid retrieval response: {0}")]
    InvalidResponse(String),
}

impl RetrievalError {
    /// Whether this failure is worth retrying
    ///
    /// Timeouts, connection failures and server-side errors are
    /// transient; client errors and malformed bodies surface immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Service { status, .. } => *status >= 500,
            Self::Config(_) | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<RetrievalError> for ragmark_core::error::Error {
    fn from(err: RetrievalError) -> Self {
        ragmark_core::error::Error::Retrieval(err.to_string())
    }
}
