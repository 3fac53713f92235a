//! MercadoLibre adapter.
//!
//! Queries the public listing search endpoint
//! (`/sites/MLC/search?q=…`), which returns one JSON document with all
//! matching listings. Prices arrive as JSON numbers; `currency_id` is a
//! standard three-letter code.

use rust_decimal::Decimal;
use serde::Deserialize;

use pricewatch_core::{ScrapedItem, DEFAULT_CURRENCY};

use crate::adapter::search_url;
use crate::client::SiteClient;
use crate::error::ScraperError;
use crate::types::{ScrapeConfig, ScrapeInput};

const SEARCH_PATH: &str = "/sites/MLC/search";
const RESULT_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    title: String,
    /// Absent on listings without an active offer.
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    currency_id: Option<String>,
    /// Canonical product page URL.
    permalink: String,
    #[serde(default)]
    condition: Option<String>,
}

pub(crate) async fn scrape(
    config: &ScrapeConfig,
    input: &ScrapeInput,
) -> Result<Vec<ScrapedItem>, ScraperError> {
    let client = SiteClient::new(config)?;
    let url = format!(
        "{}&limit={RESULT_LIMIT}",
        search_url(&input.base_url, SEARCH_PATH, "q", &input.query)
    );

    let response: SearchResponse = client.get_json(&url, "mercadolibre search").await?;

    let items = response
        .results
        .into_iter()
        .filter_map(|listing| {
            let Some(price) = listing.price else {
                tracing::debug!(
                    source = %input.source_name,
                    title = %listing.title,
                    "skipping listing without a price"
                );
                return None;
            };

            Some(ScrapedItem {
                product_name: listing.title,
                price,
                currency: listing
                    .currency_id
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                product_url: listing.permalink,
                attributes: listing
                    .condition
                    .map(|condition| serde_json::json!({ "condition": condition })),
            })
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
#[path = "mercadolibre_test.rs"]
mod mercadolibre_test;
