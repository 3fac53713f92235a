//! Database operations for the `prices` table — the durable price store.
//!
//! Rows are keyed for upsert by `product_url` (globally unique) and read by
//! `query_term`, cheapest first. Writes arrive in batches from background
//! refreshes; a batch is always one transaction.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use pricewatch_core::PriceCreate;

use crate::sources::SourceRow;
use crate::DbError;

/// A row from the `prices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRow {
    pub price_id: i64,
    pub query_term: String,
    pub source_id: i64,
    pub source_product_name: String,
    pub price: Decimal,
    pub currency: String,
    pub product_url: String,
    pub scraped_at: DateTime<Utc>,
    pub attributes: Option<serde_json::Value>,
}

/// A price row with its source attached when the read asked for it.
#[derive(Debug, Clone)]
pub struct PriceRecord {
    pub price: PriceRow,
    pub source: Option<SourceRow>,
}

/// Filters for query-scoped reads.
#[derive(Debug, Clone, Copy)]
pub struct PriceQueryFilters {
    /// Only rows with `scraped_at >= since` when set.
    pub since: Option<DateTime<Utc>>,
    pub limit: i64,
    /// Attach the source row to each record (single joined query, no N+1).
    pub include_source: bool,
}

/// Flat projection of a price joined with its source.
#[derive(Debug, sqlx::FromRow)]
struct PriceWithSourceRow {
    pub price_id: i64,
    pub query_term: String,
    pub source_id: i64,
    pub source_product_name: String,
    pub price: Decimal,
    pub currency: String,
    pub product_url: String,
    pub scraped_at: DateTime<Utc>,
    pub attributes: Option<serde_json::Value>,
    pub source_name: String,
    pub source_base_url: String,
    pub source_last_scraped_at: Option<DateTime<Utc>>,
    pub source_created_at: DateTime<Utc>,
}

impl From<PriceWithSourceRow> for PriceRecord {
    fn from(row: PriceWithSourceRow) -> Self {
        PriceRecord {
            source: Some(SourceRow {
                source_id: row.source_id,
                name: row.source_name,
                base_url: row.source_base_url,
                last_scraped_at: row.source_last_scraped_at,
                created_at: row.source_created_at,
            }),
            price: PriceRow {
                price_id: row.price_id,
                query_term: row.query_term,
                source_id: row.source_id,
                source_product_name: row.source_product_name,
                price: row.price,
                currency: row.currency,
                product_url: row.product_url,
                scraped_at: row.scraped_at,
                attributes: row.attributes,
            },
        }
    }
}

/// Returns price records for a query term, ordered by price ascending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_by_query(
    pool: &PgPool,
    query_term: &str,
    filters: PriceQueryFilters,
) -> Result<Vec<PriceRecord>, DbError> {
    if filters.include_source {
        let rows = sqlx::query_as::<_, PriceWithSourceRow>(
            "SELECT p.price_id, p.query_term, p.source_id, p.source_product_name, \
                    p.price, p.currency, p.product_url, p.scraped_at, p.attributes, \
                    s.name AS source_name, s.base_url AS source_base_url, \
                    s.last_scraped_at AS source_last_scraped_at, \
                    s.created_at AS source_created_at \
             FROM prices p \
             JOIN sources s ON s.source_id = p.source_id \
             WHERE p.query_term = $1 \
               AND ($2::timestamptz IS NULL OR p.scraped_at >= $2) \
             ORDER BY p.price ASC, p.price_id ASC \
             LIMIT $3",
        )
        .bind(query_term)
        .bind(filters.since)
        .bind(filters.limit)
        .fetch_all(pool)
        .await?;

        return Ok(rows.into_iter().map(PriceRecord::from).collect());
    }

    let rows = sqlx::query_as::<_, PriceRow>(
        "SELECT price_id, query_term, source_id, source_product_name, \
                price, currency, product_url, scraped_at, attributes \
         FROM prices \
         WHERE query_term = $1 \
           AND ($2::timestamptz IS NULL OR scraped_at >= $2) \
         ORDER BY price ASC, price_id ASC \
         LIMIT $3",
    )
    .bind(query_term)
    .bind(filters.since)
    .bind(filters.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|price| PriceRecord {
            price,
            source: None,
        })
        .collect())
}

/// Upserts a batch of price rows in a single transaction.
///
/// Conflicts on `product_url` update name, price, attributes, and
/// `scraped_at` in place. Within one batch the last write for a duplicate
/// URL wins. A failure anywhere rolls the whole batch back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn upsert_many(pool: &PgPool, items: &[PriceCreate]) -> Result<Vec<PriceRow>, DbError> {
    let mut tx = pool.begin().await?;
    let mut rows = Vec::with_capacity(items.len());

    for item in items {
        let row = sqlx::query_as::<_, PriceRow>(
            "INSERT INTO prices \
                 (query_term, source_id, source_product_name, price, currency, \
                  product_url, attributes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (product_url) DO UPDATE SET \
                 source_product_name = EXCLUDED.source_product_name, \
                 price      = EXCLUDED.price, \
                 attributes = EXCLUDED.attributes, \
                 scraped_at = NOW() \
             RETURNING price_id, query_term, source_id, source_product_name, \
                       price, currency, product_url, scraped_at, attributes",
        )
        .bind(&item.query_term)
        .bind(item.source_id)
        .bind(&item.source_product_name)
        .bind(item.price)
        .bind(&item.currency)
        .bind(&item.product_url)
        .bind(&item.attributes)
        .fetch_one(&mut *tx)
        .await?;

        rows.push(row);
    }

    tx.commit().await?;
    Ok(rows)
}

/// Deletes price rows for a query older than `days` days.
///
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn prune_older_than(
    pool: &PgPool,
    query_term: &str,
    days: u32,
) -> Result<u64, DbError> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));

    let result = sqlx::query("DELETE FROM prices WHERE query_term = $1 AND scraped_at < $2")
        .bind(query_term)
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
