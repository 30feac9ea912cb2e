#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use ragmark_core::error::Result;
use ragmark_evaluator::config::EvaluatorConfig;
use ragmark_evaluator::orchestrator::Evaluator;
use ragmark_evaluator::worker::run_worker;
use ragmark_retrieval::create_retrieval_client;
use ragmark_scoring::create_score_engine;
use ragmark_storage::{create_postgres_client, PostgresClientTrait};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting evaluation worker");

    let config = EvaluatorConfig::load_from_env()?;

    info!(
        "Connecting to Postgres at {}:{}",
        config.postgres.host, config.postgres.port
    );
    let postgres = match create_postgres_client(&config.postgres).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to Postgres: {e}");
            return Err(e);
        }
    };

    info!("Running database migrations");
    if let Err(e) = postgres.run_migrations().await {
        error!("Failed to run database migrations: {e}");
        return Err(e);
    }
    info!("Database migrations completed successfully");

    let retrieval = create_retrieval_client(&config.retrieval)?;
    let engine = create_score_engine(&config.scoring)?;

    let postgres: Arc<dyn PostgresClientTrait> = postgres;
    let evaluator = Arc::new(Evaluator::new(
        Arc::clone(&postgres),
        retrieval,
        engine,
    ));

    info!("Evaluation worker configuration loaded successfully");

    run_worker(evaluator, postgres, config.poll_interval()).await
}
