//! Background refresh: fan out to every source with a registered adapter,
//! persist the merged batch, and drive the job to a terminal state.
//!
//! Per-source failures are captured, never propagated, so one site failing
//! cannot cancel another. The job completes only when every adapter and the
//! store write succeeded; anything less is FAILED with a summary, while data
//! from the sources that did succeed is retained.

use std::sync::Arc;

use sqlx::PgPool;

use pricewatch_core::{AppConfig, PriceCreate};
use pricewatch_db::{prices, scrape_jobs, sources, DbError, SourceRow};
use pricewatch_scraper::{Adapter, ScrapeConfig, ScrapeInput};

/// Entry point for the detached refresh task. Never returns an error; every
/// failure path ends in a FAILED job and a log line.
pub(super) async fn run_refresh(
    pool: PgPool,
    config: Arc<AppConfig>,
    query_term: String,
    job_id: i64,
) {
    tracing::info!(query = %query_term, job_id, "background refresh starting");

    match execute(&pool, &config, &query_term, job_id).await {
        Ok(()) => {
            tracing::info!(query = %query_term, job_id, "background refresh finished");
        }
        Err(error) => {
            tracing::error!(query = %query_term, job_id, %error, "background refresh aborted");
            let summary = format!("refresh aborted: {error}");
            if let Err(db_error) = scrape_jobs::mark_failed(&pool, job_id, &summary).await {
                tracing::error!(job_id, error = %db_error, "could not mark aborted job FAILED");
            }
        }
    }
}

async fn execute(
    pool: &PgPool,
    config: &AppConfig,
    query_term: &str,
    job_id: i64,
) -> Result<(), DbError> {
    scrape_jobs::mark_running(pool, job_id).await?;

    let all_sources = sources::list(pool).await?;
    if all_sources.is_empty() {
        tracing::warn!(query = %query_term, job_id, "no sources configured for scraping");
        scrape_jobs::mark_failed(pool, job_id, "no active sources").await?;
        return Ok(());
    }

    // Sources without a registered adapter contribute nothing; a refresh
    // where every source was skipped still completes with zero items.
    let targets = adapter_targets(all_sources);
    if targets.is_empty() {
        tracing::warn!(query = %query_term, job_id, "no source has a registered adapter");
    }

    let scrape_config = ScrapeConfig::from_app_config(config);
    let scrapes = targets.iter().map(|(source, adapter)| {
        let scrape_config = scrape_config.clone();
        let input = ScrapeInput {
            query: query_term.to_string(),
            source_id: source.source_id,
            source_name: source.name.clone(),
            base_url: source.base_url.clone(),
        };
        async move { adapter.scrape(&scrape_config, &input).await }
    });
    let outcomes = futures::future::join_all(scrapes).await;

    let mut batch: Vec<PriceCreate> = Vec::new();
    let mut failures: Vec<String> = Vec::new();
    let mut scraped_source_ids: Vec<i64> = Vec::new();

    for ((source, _), outcome) in targets.iter().zip(outcomes) {
        match outcome {
            Ok(items) => {
                tracing::info!(
                    query = %query_term,
                    source = %source.name,
                    job_id,
                    items = items.len(),
                    "adapter finished"
                );
                scraped_source_ids.push(source.source_id);
                batch.extend(
                    items
                        .into_iter()
                        .map(|item| PriceCreate::from_scraped(item, query_term, source.source_id)),
                );
            }
            Err(error) => {
                tracing::error!(
                    query = %query_term,
                    source = %source.name,
                    job_id,
                    %error,
                    "adapter failed"
                );
                failures.push(format!("{}: {error}", source.name));
            }
        }
    }

    if !batch.is_empty() {
        match prices::upsert_many(pool, &batch).await {
            Ok(rows) => {
                tracing::info!(
                    query = %query_term,
                    job_id,
                    persisted = rows.len(),
                    "persisted scraped prices"
                );
            }
            Err(error) => {
                tracing::error!(query = %query_term, job_id, %error, "store write failed");
                failures.push(format!("store write failed: {error}"));
                scrape_jobs::mark_failed(pool, job_id, &failures.join("; ")).await?;
                return Ok(());
            }
        }
    }

    if failures.is_empty() {
        sources::touch_last_scraped(pool, &scraped_source_ids).await?;

        let pruned =
            prices::prune_older_than(pool, query_term, config.price_retention_days).await?;
        if pruned > 0 {
            tracing::info!(query = %query_term, job_id, pruned, "pruned aged-out prices");
        }

        scrape_jobs::mark_completed(pool, job_id).await?;
    } else {
        scrape_jobs::mark_failed(pool, job_id, &failures.join("; ")).await?;
    }

    Ok(())
}

/// Pairs each source with its registered adapter, skipping sources the
/// registry does not know. Skipping is intentional forward compatibility
/// with administratively added sources.
fn adapter_targets(all_sources: Vec<SourceRow>) -> Vec<(SourceRow, Adapter)> {
    all_sources
        .into_iter()
        .filter_map(|source| match Adapter::for_source_name(&source.name) {
            Some(adapter) => Some((source, adapter)),
            None => {
                tracing::warn!(source = %source.name, "no adapter registered for source, skipping");
                None
            }
        })
        .collect()
}
