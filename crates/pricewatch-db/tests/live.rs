//! Live integration tests for pricewatch-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/pricewatch-db/`), so `"../../migrations"` resolves to the
//! workspace migration directory.

use chrono::{Duration, Utc};
use pricewatch_core::PriceCreate;
use pricewatch_db::{prices, scrape_jobs, sources, PriceQueryFilters};
use rust_decimal::Decimal;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a source row and return its generated id.
async fn insert_test_source(pool: &sqlx::PgPool, name: &str) -> i64 {
    sources::create(pool, name, &format!("https://{name}.example.com"))
        .await
        .unwrap_or_else(|e| panic!("insert_test_source failed for '{name}': {e}"))
        .source_id
}

fn make_price_create(query_term: &str, source_id: i64, url: &str, price: Decimal) -> PriceCreate {
    PriceCreate {
        query_term: query_term.to_string(),
        source_id,
        source_product_name: format!("Product at {url}"),
        price,
        currency: "CLP".to_string(),
        product_url: url.to_string(),
        attributes: None,
    }
}

async fn count_prices(pool: &sqlx::PgPool, query_term: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM prices WHERE query_term = $1")
        .bind(query_term)
        .fetch_one(pool)
        .await
        .expect("count_prices failed")
}

// ---------------------------------------------------------------------------
// Section 1: Scrape job lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_job_lifecycle_pending_to_completed(pool: sqlx::PgPool) {
    let job = scrape_jobs::create(&pool, "laptop", None)
        .await
        .expect("create failed")
        .expect("expected a new job, got an active-slot conflict");

    assert_eq!(job.status, "PENDING");
    assert!(job.started_at.is_none());
    assert!(job.completed_at.is_none());

    let running = scrape_jobs::mark_running(&pool, job.job_id)
        .await
        .expect("mark_running failed");
    assert_eq!(running.status, "RUNNING");
    assert!(running.started_at.is_some(), "started_at should be set");

    let completed = scrape_jobs::mark_completed(&pool, job.job_id)
        .await
        .expect("mark_completed failed");
    assert_eq!(completed.status, "COMPLETED");
    assert!(completed.completed_at.is_some(), "completed_at should be set");
    assert!(completed.error_message.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_job_lifecycle_pending_to_failed(pool: sqlx::PgPool) {
    let job = scrape_jobs::create(&pool, "laptop", None)
        .await
        .expect("create failed")
        .expect("expected a new job");

    scrape_jobs::mark_running(&pool, job.job_id)
        .await
        .expect("mark_running failed");

    let failed = scrape_jobs::mark_failed(&pool, job.job_id, "mercadolibre: timed out")
        .await
        .expect("mark_failed failed");
    assert_eq!(failed.status, "FAILED");
    assert!(failed.completed_at.is_some());
    assert_eq!(failed.error_message.as_deref(), Some("mercadolibre: timed out"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_create_loses_to_the_active_job(pool: sqlx::PgPool) {
    let first = scrape_jobs::create(&pool, "laptop", None)
        .await
        .expect("create failed")
        .expect("expected a new job");

    // The partial unique index keeps the PENDING winner; a second insert
    // comes back empty instead of erroring.
    let second = scrape_jobs::create(&pool, "laptop", None)
        .await
        .expect("second create failed");
    assert!(second.is_none(), "conflicting create should return None");

    let active = scrape_jobs::find_active(&pool, "laptop")
        .await
        .expect("find_active failed")
        .expect("an active job should exist");
    assert_eq!(active.job_id, first.job_id);

    // A different query term is unaffected.
    let other = scrape_jobs::create(&pool, "smart tv", None)
        .await
        .expect("create for other query failed");
    assert!(other.is_some());

    // Once the winner reaches a terminal state the slot frees up.
    scrape_jobs::mark_running(&pool, first.job_id)
        .await
        .expect("mark_running failed");
    scrape_jobs::mark_completed(&pool, first.job_id)
        .await
        .expect("mark_completed failed");

    let replacement = scrape_jobs::create(&pool, "laptop", None)
        .await
        .expect("create after completion failed");
    assert!(replacement.is_some(), "slot should be free after completion");
}

#[sqlx::test(migrations = "../../migrations")]
async fn transition_gate_misses_return_the_current_row(pool: sqlx::PgPool) {
    let job = scrape_jobs::create(&pool, "laptop", None)
        .await
        .expect("create failed")
        .expect("expected a new job");

    // COMPLETED requires RUNNING; on a PENDING job nothing changes.
    let still_pending = scrape_jobs::mark_completed(&pool, job.job_id)
        .await
        .expect("mark_completed gate miss failed");
    assert_eq!(still_pending.status, "PENDING");
    assert!(still_pending.completed_at.is_none());

    let running = scrape_jobs::mark_running(&pool, job.job_id)
        .await
        .expect("mark_running failed");
    let started_at = running.started_at.expect("started_at should be set");

    scrape_jobs::mark_completed(&pool, job.job_id)
        .await
        .expect("mark_completed failed");

    // RUNNING requires PENDING; on a terminal job this is a no-op that
    // hands back the terminal row, started_at untouched.
    let after = scrape_jobs::mark_running(&pool, job.job_id)
        .await
        .expect("mark_running gate miss failed");
    assert_eq!(after.status, "COMPLETED");
    assert_eq!(after.started_at, Some(started_at));

    // FAILED requires an active job; a completed one keeps its state.
    let still_completed = scrape_jobs::mark_failed(&pool, job.job_id, "too late")
        .await
        .expect("mark_failed gate miss failed");
    assert_eq!(still_completed.status, "COMPLETED");
    assert!(still_completed.error_message.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn fail_stale_times_out_old_active_jobs(pool: sqlx::PgPool) {
    let stale = scrape_jobs::create(&pool, "laptop", None)
        .await
        .expect("create failed")
        .expect("expected a new job");
    let fresh = scrape_jobs::create(&pool, "smart tv", None)
        .await
        .expect("create failed")
        .expect("expected a new job");

    sqlx::query("UPDATE scrape_jobs SET created_at = NOW() - INTERVAL '2 hours' WHERE job_id = $1")
        .bind(stale.job_id)
        .execute(&pool)
        .await
        .expect("backdating created_at failed");

    let swept = scrape_jobs::fail_stale(&pool, 60).await.expect("fail_stale failed");
    assert_eq!(swept, 1);

    let stale_after = scrape_jobs::get(&pool, stale.job_id).await.expect("get failed");
    assert_eq!(stale_after.status, "FAILED");
    assert_eq!(
        stale_after.error_message.as_deref(),
        Some("timed out by recovery sweep")
    );

    let fresh_after = scrape_jobs::get(&pool, fresh.job_id).await.expect("get failed");
    assert_eq!(fresh_after.status, "PENDING");
}

// ---------------------------------------------------------------------------
// Section 2: Price store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_many_inserts_then_updates_in_place(pool: sqlx::PgPool) {
    let source_id = insert_test_source(&pool, "mercadolibre").await;
    let url = "https://articulo.mercadolibre.cl/MLC-1";

    let first = prices::upsert_many(
        &pool,
        &[make_price_create("laptop", source_id, url, Decimal::new(499_990, 0))],
    )
    .await
    .expect("first upsert failed");
    assert_eq!(first.len(), 1);

    let mut updated_item = make_price_create("laptop", source_id, url, Decimal::new(459_990, 0));
    updated_item.source_product_name = "Notebook 14 (renamed)".to_string();
    updated_item.attributes = Some(json!({"condition": "new"}));

    let second = prices::upsert_many(&pool, &[updated_item])
        .await
        .expect("second upsert failed");
    assert_eq!(second.len(), 1);

    assert_eq!(count_prices(&pool, "laptop").await, 1, "upsert must not duplicate rows");

    let row = &second[0];
    assert_eq!(row.price_id, first[0].price_id);
    assert_eq!(row.price, Decimal::new(459_990, 0));
    assert_eq!(row.source_product_name, "Notebook 14 (renamed)");
    assert_eq!(row.attributes, Some(json!({"condition": "new"})));
    assert!(
        row.scraped_at >= first[0].scraped_at,
        "scraped_at should be refreshed on update"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_many_last_write_wins_within_a_batch(pool: sqlx::PgPool) {
    let source_id = insert_test_source(&pool, "mercadolibre").await;
    let url = "https://articulo.mercadolibre.cl/MLC-1";

    prices::upsert_many(
        &pool,
        &[
            make_price_create("laptop", source_id, url, Decimal::new(499_990, 0)),
            make_price_create("laptop", source_id, url, Decimal::new(479_990, 0)),
        ],
    )
    .await
    .expect("batch upsert failed");

    assert_eq!(count_prices(&pool, "laptop").await, 1);

    let records = prices::list_by_query(
        &pool,
        "laptop",
        PriceQueryFilters {
            since: None,
            limit: 10,
            include_source: false,
        },
    )
    .await
    .expect("list_by_query failed");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].price.price, Decimal::new(479_990, 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_many_rolls_back_the_whole_batch_on_failure(pool: sqlx::PgPool) {
    let source_id = insert_test_source(&pool, "mercadolibre").await;

    let result = prices::upsert_many(
        &pool,
        &[
            make_price_create(
                "laptop",
                source_id,
                "https://articulo.mercadolibre.cl/MLC-1",
                Decimal::new(499_990, 0),
            ),
            // Nonexistent source violates the foreign key mid-batch.
            make_price_create(
                "laptop",
                source_id + 1000,
                "https://articulo.mercadolibre.cl/MLC-2",
                Decimal::new(99_990, 0),
            ),
        ],
    )
    .await;

    assert!(result.is_err(), "batch with an FK violation must fail");
    assert_eq!(
        count_prices(&pool, "laptop").await,
        0,
        "a failed batch must leave the store untouched"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_by_query_orders_by_price_and_attaches_sources(pool: sqlx::PgPool) {
    let ml_id = insert_test_source(&pool, "mercadolibre").await;
    let fb_id = insert_test_source(&pool, "falabella").await;

    prices::upsert_many(
        &pool,
        &[
            make_price_create(
                "laptop",
                ml_id,
                "https://articulo.mercadolibre.cl/MLC-1",
                Decimal::new(499_990, 0),
            ),
            make_price_create(
                "laptop",
                fb_id,
                "https://www.falabella.example.com/product/1",
                Decimal::new(459_990, 0),
            ),
            make_price_create(
                "smart tv",
                fb_id,
                "https://www.falabella.example.com/product/2",
                Decimal::new(299_990, 0),
            ),
        ],
    )
    .await
    .expect("seed upsert failed");

    let records = prices::list_by_query(
        &pool,
        "laptop",
        PriceQueryFilters {
            since: None,
            limit: 10,
            include_source: true,
        },
    )
    .await
    .expect("list_by_query failed");

    assert_eq!(records.len(), 2, "other query terms must not leak in");
    assert_eq!(records[0].price.price, Decimal::new(459_990, 0));
    assert_eq!(records[1].price.price, Decimal::new(499_990, 0));

    let cheapest_source = records[0].source.as_ref().expect("source should be attached");
    assert_eq!(cheapest_source.name, "falabella");

    let plain = prices::list_by_query(
        &pool,
        "laptop",
        PriceQueryFilters {
            since: None,
            limit: 10,
            include_source: false,
        },
    )
    .await
    .expect("plain list_by_query failed");
    assert!(plain[0].source.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_by_query_honors_the_since_filter(pool: sqlx::PgPool) {
    let source_id = insert_test_source(&pool, "mercadolibre").await;

    prices::upsert_many(
        &pool,
        &[
            make_price_create(
                "laptop",
                source_id,
                "https://articulo.mercadolibre.cl/MLC-1",
                Decimal::new(499_990, 0),
            ),
            make_price_create(
                "laptop",
                source_id,
                "https://articulo.mercadolibre.cl/MLC-2",
                Decimal::new(459_990, 0),
            ),
        ],
    )
    .await
    .expect("seed upsert failed");

    sqlx::query(
        "UPDATE prices SET scraped_at = NOW() - INTERVAL '2 hours' WHERE product_url = $1",
    )
    .bind("https://articulo.mercadolibre.cl/MLC-2")
    .execute(&pool)
    .await
    .expect("backdating scraped_at failed");

    let recent = prices::list_by_query(
        &pool,
        "laptop",
        PriceQueryFilters {
            since: Some(Utc::now() - Duration::hours(1)),
            limit: 10,
            include_source: false,
        },
    )
    .await
    .expect("list_by_query with since failed");

    assert_eq!(recent.len(), 1);
    assert_eq!(
        recent[0].price.product_url,
        "https://articulo.mercadolibre.cl/MLC-1"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn prune_older_than_deletes_only_aged_rows_for_the_query(pool: sqlx::PgPool) {
    let source_id = insert_test_source(&pool, "mercadolibre").await;

    prices::upsert_many(
        &pool,
        &[
            make_price_create(
                "laptop",
                source_id,
                "https://articulo.mercadolibre.cl/MLC-1",
                Decimal::new(499_990, 0),
            ),
            make_price_create(
                "laptop",
                source_id,
                "https://articulo.mercadolibre.cl/MLC-2",
                Decimal::new(459_990, 0),
            ),
            make_price_create(
                "smart tv",
                source_id,
                "https://articulo.mercadolibre.cl/MLC-3",
                Decimal::new(299_990, 0),
            ),
        ],
    )
    .await
    .expect("seed upsert failed");

    // Age out one laptop row and the smart-tv row.
    sqlx::query("UPDATE prices SET scraped_at = NOW() - INTERVAL '10 days' WHERE product_url = ANY($1)")
        .bind(vec![
            "https://articulo.mercadolibre.cl/MLC-2".to_string(),
            "https://articulo.mercadolibre.cl/MLC-3".to_string(),
        ])
        .execute(&pool)
        .await
        .expect("backdating scraped_at failed");

    let deleted = prices::prune_older_than(&pool, "laptop", 7)
        .await
        .expect("prune_older_than failed");
    assert_eq!(deleted, 1);

    assert_eq!(count_prices(&pool, "laptop").await, 1);
    assert_eq!(
        count_prices(&pool, "smart tv").await,
        1,
        "pruning is query-scoped; other queries keep their aged rows"
    );
}
