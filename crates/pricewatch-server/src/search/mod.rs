//! The search coordinator: answers read requests from cache or store and
//! decides when to launch a background refresh.
//!
//! The read path is strictly ordered: cache read, then store read, then the
//! refresh decision, then the job-registry read, then job creation. Only the
//! cache/store read is synchronous with the caller; scraping always happens
//! in a detached task.

mod refresh;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;

use pricewatch_cache::{CacheError, ResultCache};
use pricewatch_core::{AppConfig, SearchResultItem};
use pricewatch_db::{prices, scrape_jobs, DbError, PriceQueryFilters, PriceRecord};

/// Upper bound on rows pulled from the store for one query.
const STORE_READ_LIMIT: i64 = 200;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// What the search endpoint returns to the caller.
#[derive(Debug)]
pub struct SearchOutcome {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    pub from_cache: bool,
    pub message: Option<String>,
    pub job_id: Option<i64>,
}

pub struct SearchCoordinator {
    pool: PgPool,
    cache: ResultCache,
    config: Arc<AppConfig>,
}

impl SearchCoordinator {
    #[must_use]
    pub fn new(pool: PgPool, cache: ResultCache, config: Arc<AppConfig>) -> Self {
        Self {
            pool,
            cache,
            config,
        }
    }

    /// Serves one search request for an already-normalized query term.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] when the store or the cache cannot be
    /// reached. Adapter failures never surface here; they belong to the
    /// background refresh.
    pub async fn search(
        &self,
        query_term: &str,
        force_refresh: bool,
    ) -> Result<SearchOutcome, SearchError> {
        let mut from_cache = false;
        let mut cached = None;

        if !force_refresh {
            cached = self.cache.get(query_term).await?;
            if let Some(items) = &cached {
                tracing::info!(query = %query_term, results = items.len(), "cache hit");
                from_cache = true;
            } else {
                tracing::debug!(query = %query_term, "cache miss");
            }
        }

        let results = match cached {
            Some(items) => items,
            None => {
                let records = prices::list_by_query(
                    &self.pool,
                    query_term,
                    PriceQueryFilters {
                        since: None,
                        limit: STORE_READ_LIMIT,
                        include_source: true,
                    },
                )
                .await?;
                let formatted = project_records(records);

                // Only non-empty lists are cached; an empty list must stay a
                // miss so the next request retries the store.
                if !formatted.is_empty() {
                    self.cache
                        .set(query_term, &formatted, self.config.cache_expiration_secs)
                        .await?;
                }
                formatted
            }
        };

        let threshold = seconds(self.config.staleness_threshold_secs);
        let should_refresh =
            force_refresh || (!from_cache && is_stale(&results, Utc::now(), threshold));

        let mut message = None;
        let mut job_id = None;

        if should_refresh {
            match scrape_jobs::find_active(&self.pool, query_term).await? {
                Some(existing) => {
                    tracing::info!(
                        query = %query_term,
                        job_id = existing.job_id,
                        status = %existing.status,
                        "refresh suppressed, active job exists"
                    );
                    message = Some(already_running_message(&existing.status));
                    job_id = Some(existing.job_id);
                }
                None => match scrape_jobs::create(&self.pool, query_term, None).await? {
                    Some(job) => {
                        tracing::info!(query = %query_term, job_id = job.job_id, "created refresh job");
                        message = Some(if force_refresh {
                            "Forced refresh started in the background.".to_string()
                        } else if results.is_empty() {
                            "No stored results yet; refresh started in the background.".to_string()
                        } else {
                            "Stored results are stale; refresh started in the background."
                                .to_string()
                        });
                        job_id = Some(job.job_id);
                        self.spawn_refresh(query_term, job.job_id);
                    }
                    None => {
                        // Lost the insert race; the partial unique index kept
                        // the winner. Surface that job instead.
                        if let Some(existing) =
                            scrape_jobs::find_active(&self.pool, query_term).await?
                        {
                            message = Some(already_running_message(&existing.status));
                            job_id = Some(existing.job_id);
                        }
                    }
                },
            }
        }

        Ok(SearchOutcome {
            query: query_term.to_string(),
            results,
            from_cache: from_cache && !force_refresh,
            message,
            job_id,
        })
    }

    /// Detaches the refresh onto the runtime. The task owns cloned handles;
    /// nothing request-scoped crosses the asynchronous boundary.
    fn spawn_refresh(&self, query_term: &str, job_id: i64) {
        let pool = self.pool.clone();
        let config = Arc::clone(&self.config);
        let query_term = query_term.to_string();

        tokio::spawn(async move {
            refresh::run_refresh(pool, config, query_term, job_id).await;
        });
    }
}

fn already_running_message(status: &str) -> String {
    format!(
        "A refresh is already {} for this query.",
        status.to_lowercase()
    )
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

/// Projects store records into the cache/API shape, denormalizing the source
/// name. Records read without their source are dropped with a warning.
fn project_records(records: Vec<PriceRecord>) -> Vec<SearchResultItem> {
    records
        .into_iter()
        .filter_map(|record| {
            let Some(source) = record.source else {
                tracing::warn!(
                    price_id = record.price.price_id,
                    "price record read without its source, skipping"
                );
                return None;
            };

            Some(SearchResultItem {
                source_name: source.name,
                source_product_name: record.price.source_product_name,
                price: record.price.price,
                currency: record.price.currency,
                product_url: record.price.product_url,
                scraped_at: record.price.scraped_at,
            })
        })
        .collect()
}

/// An empty result set is stale by definition (forces the first scrape);
/// otherwise one record older than the threshold marks the whole query
/// stale, and the entire set is re-fetched.
fn is_stale(results: &[SearchResultItem], now: DateTime<Utc>, threshold: Duration) -> bool {
    if results.is_empty() {
        return true;
    }
    let cutoff = now - threshold;
    results.iter().any(|item| item.scraped_at < cutoff)
}
