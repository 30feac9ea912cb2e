//! Evaluation orchestration
//!
//! This crate drives evaluation runs: it owns the job/run state machine,
//! processes a dataset's questions strictly sequentially, publishes live
//! progress, and aggregates statistics when a run completes.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod orchestrator;
pub mod progress;
pub mod statistics;
pub mod worker;

pub use config::EvaluatorConfig;
pub use orchestrator::Evaluator;
pub use progress::{progress_cache_key, ProgressEntry, ProgressPublisher};
pub use worker::run_worker;
