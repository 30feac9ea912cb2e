//! Poll loop claiming pending evaluation jobs

use crate::orchestrator::Evaluator;
use ragmark_core::error::Result;
use ragmark_storage::PostgresClientTrait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// Run the evaluation worker loop (runs indefinitely until the process
/// is killed)
///
/// One run is claimed and driven to completion at a time; concurrency
/// across runs comes from running multiple worker processes. Run
/// failures are logged and already recorded on the job row, so the loop
/// moves on to the next claim.
pub async fn run_worker(
    evaluator: Arc<Evaluator>,
    postgres: Arc<dyn PostgresClientTrait>,
    poll_interval: Duration,
) -> Result<()> {
    info!("Evaluation worker started");

    loop {
        match postgres.claim_pending_job().await {
            Ok(Some(claim)) => {
                info!("Claimed job {} (run {})", claim.job_id, claim.run_id);

                let top_k = usize::try_from(claim.top_k).unwrap_or(0);
                if let Err(e) = evaluator
                    .start_evaluation(claim.job_id, claim.run_id, claim.dataset_id, top_k)
                    .await
                {
                    error!("Run {} failed: {e}", claim.run_id);
                }
            }
            Ok(None) => {
                sleep(poll_interval).await;
            }
            Err(e) => {
                error!("Failed to poll for pending jobs: {e}");
                sleep(poll_interval).await;
            }
        }
    }
}
