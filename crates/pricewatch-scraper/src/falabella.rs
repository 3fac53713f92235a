//! Falabella adapter.
//!
//! Queries the storefront's browse/search JSON endpoint
//! (`/s/browse/v1/search/cl?term=…`). Prices come back as display strings in
//! Chilean formatting (`"1.299.990"`), so they go through
//! [`parse_price_text`] before use; entries whose price text does not parse
//! are skipped.

use serde::Deserialize;

use pricewatch_core::{ScrapedItem, DEFAULT_CURRENCY};

use crate::adapter::search_url;
use crate::client::SiteClient;
use crate::error::ScraperError;
use crate::price::parse_price_text;
use crate::types::{ScrapeConfig, ScrapeInput};

const SEARCH_PATH: &str = "/s/browse/v1/search/cl";

#[derive(Debug, Deserialize)]
struct BrowseResponse {
    #[serde(default)]
    data: Option<BrowseData>,
}

#[derive(Debug, Deserialize)]
struct BrowseData {
    #[serde(default)]
    results: Vec<ProductHit>,
}

#[derive(Debug, Deserialize)]
struct ProductHit {
    #[serde(rename = "displayName")]
    display_name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    prices: Vec<PriceEntry>,
}

/// One price tier; `price` is a list of display strings, the first of which
/// is the amount actually shown on the listing card.
#[derive(Debug, Deserialize)]
struct PriceEntry {
    #[serde(default)]
    price: Vec<String>,
}

pub(crate) async fn scrape(
    config: &ScrapeConfig,
    input: &ScrapeInput,
) -> Result<Vec<ScrapedItem>, ScraperError> {
    let client = SiteClient::new(config)?;
    let url = search_url(&input.base_url, SEARCH_PATH, "term", &input.query);

    let response: BrowseResponse = client.get_json(&url, "falabella search").await?;

    let hits = response.data.map(|data| data.results).unwrap_or_default();

    let items = hits
        .into_iter()
        .filter_map(|hit| {
            let price = hit
                .prices
                .iter()
                .flat_map(|entry| entry.price.iter())
                .find_map(|text| parse_price_text(text));

            let Some(price) = price else {
                tracing::debug!(
                    source = %input.source_name,
                    product = %hit.display_name,
                    "skipping product without a parseable price"
                );
                return None;
            };
            let Some(url) = hit.url else {
                tracing::debug!(
                    source = %input.source_name,
                    product = %hit.display_name,
                    "skipping product without a URL"
                );
                return None;
            };

            Some(ScrapedItem {
                product_name: hit.display_name,
                price,
                currency: DEFAULT_CURRENCY.to_string(),
                product_url: url,
                attributes: hit
                    .brand
                    .map(|brand| serde_json::json!({ "brand": brand })),
            })
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
#[path = "falabella_test.rs"]
mod falabella_test;
