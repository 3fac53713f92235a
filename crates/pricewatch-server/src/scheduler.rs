//! Recovery sweep for orphaned scrape jobs.
//!
//! A crash can leave a job PENDING or RUNNING forever, which blocks every
//! future refresh for that query (the active-job slot acts as a lock). The
//! sweep terminal-fails active jobs older than the configured timeout so
//! the query can refresh again.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use pricewatch_core::AppConfig;
use pricewatch_db::scrape_jobs;

/// Builds and starts the background scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down the sweep.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised or
/// started.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let interval = Duration::from_secs(config.job_sweep_interval_secs);
    let timeout_minutes = config.job_timeout_minutes;

    let sweep = Job::new_repeated_async(interval, move |_id, _lock| {
        let pool = pool.clone();
        Box::pin(async move {
            match scrape_jobs::fail_stale(&pool, timeout_minutes).await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::warn!(count, timeout_minutes, "recovery sweep timed out stale jobs");
                }
                Err(error) => {
                    tracing::error!(%error, "recovery sweep failed");
                }
            }
        })
    })?;

    scheduler.add(sweep).await?;
    scheduler.start().await?;
    Ok(scheduler)
}
