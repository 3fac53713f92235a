//! Database operations for the `sources` table.
//!
//! Sources are created administratively (via the CLI); the server treats the
//! set as a read-mostly list re-read at the start of each refresh.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub source_id: i64,
    pub name: String,
    pub base_url: String,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Returns all sources ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list(pool: &PgPool) -> Result<Vec<SourceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourceRow>(
        "SELECT source_id, name, base_url, last_scraped_at, created_at \
         FROM sources \
         ORDER BY source_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a single source by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get(pool: &PgPool, source_id: i64) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(
        "SELECT source_id, name, base_url, last_scraped_at, created_at \
         FROM sources \
         WHERE source_id = $1",
    )
    .bind(source_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Inserts a new source. `name` is unique; a duplicate surfaces as
/// [`DbError::Sqlx`] carrying the constraint violation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create(pool: &PgPool, name: &str, base_url: &str) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(
        "INSERT INTO sources (name, base_url) \
         VALUES ($1, $2) \
         RETURNING source_id, name, base_url, last_scraped_at, created_at",
    )
    .bind(name)
    .bind(base_url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Stamps `last_scraped_at = NOW()` on the given sources after a successful
/// scrape.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn touch_last_scraped(pool: &PgPool, source_ids: &[i64]) -> Result<(), DbError> {
    if source_ids.is_empty() {
        return Ok(());
    }

    sqlx::query("UPDATE sources SET last_scraped_at = NOW() WHERE source_id = ANY($1)")
        .bind(source_ids)
        .execute(pool)
        .await?;

    Ok(())
}
