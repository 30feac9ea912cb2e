//! PostgreSQL persistence for ragmark evaluation runs

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod postgres;

pub use postgres::{
    JobRow, MockPostgresClient, NewResult, PendingEvaluation, PostgresClient,
    PostgresClientTrait, QuestionRow, ResultRow, RunRow,
};

use ragmark_core::error::{Error, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::sync::Arc;

/// Connection settings for the PostgreSQL store
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "ragmark".to_string(),
            user: "ragmark".to_string(),
            password: "ragmark".to_string(),
            max_connections: 5,
        }
    }
}

/// Create a PostgreSQL client from configuration
pub async fn create_postgres_client(config: &PostgresConfig) -> Result<Arc<PostgresClient>> {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| Error::storage(format!("Failed to connect to Postgres: {e}")))?;

    Ok(Arc::new(PostgresClient::new(pool)))
}
