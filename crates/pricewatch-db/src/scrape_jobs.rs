//! Database operations for the `scrape_jobs` table — the refresh job registry.
//!
//! Statuses progress PENDING → RUNNING → {COMPLETED, FAILED}, never backward.
//! Transitions are gated in SQL by the expected prior status; a transition
//! whose gate does not match is a no-op that returns the current row.
//!
//! A unique partial index on `(query_term) WHERE status IN
//! ('PENDING','RUNNING')` guarantees at most one active job per query even
//! under concurrent coordinators; [`create`] treats an insert conflict as
//! "an active job already exists".

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::DbError;

const SELECT_COLUMNS: &str = "job_id, query_term, source_id, status, \
                              started_at, completed_at, created_at, error_message";

/// A row from the `scrape_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeJobRow {
    pub job_id: i64,
    pub query_term: String,
    /// `NULL` means the job covers all sources.
    pub source_id: Option<i64>,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

/// Fetches a single job by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get(pool: &PgPool, job_id: i64) -> Result<ScrapeJobRow, DbError> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM scrape_jobs WHERE job_id = $1");
    let row = sqlx::query_as::<_, ScrapeJobRow>(&sql)
        .bind(job_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the PENDING or RUNNING job for a query term, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_active(
    pool: &PgPool,
    query_term: &str,
) -> Result<Option<ScrapeJobRow>, DbError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM scrape_jobs \
         WHERE query_term = $1 AND status IN ('PENDING', 'RUNNING') \
         ORDER BY created_at DESC, job_id DESC \
         LIMIT 1"
    );
    let row = sqlx::query_as::<_, ScrapeJobRow>(&sql)
        .bind(query_term)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Inserts a new PENDING job for a query.
///
/// Returns `None` when the partial unique index rejects the insert because
/// an active job already holds the slot — callers fall back to
/// [`find_active`] for the winner's id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create(
    pool: &PgPool,
    query_term: &str,
    source_id: Option<i64>,
) -> Result<Option<ScrapeJobRow>, DbError> {
    let sql = format!(
        "INSERT INTO scrape_jobs (query_term, source_id, status) \
         VALUES ($1, $2, 'PENDING') \
         ON CONFLICT (query_term) WHERE status IN ('PENDING', 'RUNNING') DO NOTHING \
         RETURNING {SELECT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ScrapeJobRow>(&sql)
        .bind(query_term)
        .bind(source_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// PENDING → RUNNING, stamping `started_at = NOW()`.
///
/// No-op returning the current row if the job is not PENDING.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the job does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_running(pool: &PgPool, job_id: i64) -> Result<ScrapeJobRow, DbError> {
    let sql = format!(
        "UPDATE scrape_jobs \
         SET status = 'RUNNING', started_at = NOW() \
         WHERE job_id = $1 AND status = 'PENDING' \
         RETURNING {SELECT_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, ScrapeJobRow>(&sql)
        .bind(job_id)
        .fetch_optional(pool)
        .await?;

    match updated {
        Some(row) => Ok(row),
        None => get(pool, job_id).await,
    }
}

/// RUNNING → COMPLETED, stamping `completed_at = NOW()`.
///
/// No-op returning the current row if the job is not RUNNING.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the job does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_completed(pool: &PgPool, job_id: i64) -> Result<ScrapeJobRow, DbError> {
    let sql = format!(
        "UPDATE scrape_jobs \
         SET status = 'COMPLETED', completed_at = NOW() \
         WHERE job_id = $1 AND status = 'RUNNING' \
         RETURNING {SELECT_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, ScrapeJobRow>(&sql)
        .bind(job_id)
        .fetch_optional(pool)
        .await?;

    match updated {
        Some(row) => Ok(row),
        None => get(pool, job_id).await,
    }
}

/// {PENDING, RUNNING} → FAILED, stamping `completed_at = NOW()` and the
/// error message.
///
/// No-op returning the current row if the job is already terminal.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the job does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_failed(
    pool: &PgPool,
    job_id: i64,
    error_message: &str,
) -> Result<ScrapeJobRow, DbError> {
    let sql = format!(
        "UPDATE scrape_jobs \
         SET status = 'FAILED', completed_at = NOW(), error_message = $1 \
         WHERE job_id = $2 AND status IN ('PENDING', 'RUNNING') \
         RETURNING {SELECT_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, ScrapeJobRow>(&sql)
        .bind(error_message)
        .bind(job_id)
        .fetch_optional(pool)
        .await?;

    match updated {
        Some(row) => Ok(row),
        None => get(pool, job_id).await,
    }
}

/// Terminal-fails active jobs older than `older_than_minutes`.
///
/// Orphaned jobs (left PENDING or RUNNING by a crash) act as locks that
/// block future refreshes for the same query; the recovery sweep releases
/// them. Returns the number of jobs timed out.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_stale(pool: &PgPool, older_than_minutes: u32) -> Result<u64, DbError> {
    let cutoff = Utc::now() - Duration::minutes(i64::from(older_than_minutes));

    let result = sqlx::query(
        "UPDATE scrape_jobs \
         SET status = 'FAILED', completed_at = NOW(), \
             error_message = 'timed out by recovery sweep' \
         WHERE status IN ('PENDING', 'RUNNING') AND created_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Returns the most recent `limit` jobs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<ScrapeJobRow>, DbError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM scrape_jobs \
         ORDER BY created_at DESC, job_id DESC \
         LIMIT $1"
    );
    let rows = sqlx::query_as::<_, ScrapeJobRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
