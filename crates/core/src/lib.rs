//! Core types for the ragmark retrieval-evaluation system
//!
//! This crate provides the foundational abstractions used throughout
//! ragmark:
//!
//! - **Domain types**: jobs, runs, questions, results, scores
//! - **Statistics models**: per-metric aggregate statistics
//! - **Error handling**: unified error types
//!

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod error;
pub mod types;

// Re-export main types for convenience
pub use error::{Error, Result, ResultExt};
pub use types::{
    AverageScores, EvalSample, FailureKind, JobStatus, Metric, MetricStats, ResultOutcome,
    ResultStatus, RunStatistics, RunStatus, RunSummary, ScoreSet,
};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
