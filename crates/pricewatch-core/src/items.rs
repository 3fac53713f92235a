//! Shared domain types flowing between the scraper, the store, and the API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency assumed when a site does not state one.
pub const DEFAULT_CURRENCY: &str = "CLP";

/// One product offering as emitted by a source adapter, before it is tagged
/// with the query term and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedItem {
    pub product_name: String,
    pub price: Decimal,
    pub currency: String,
    /// Absolute URL of the product page. The natural key for upserts.
    pub product_url: String,
    /// Unstructured extras (brand, condition, …) kept as opaque JSON.
    pub attributes: Option<serde_json::Value>,
}

/// A price row ready for persistence.
#[derive(Debug, Clone)]
pub struct PriceCreate {
    pub query_term: String,
    pub source_id: i64,
    pub source_product_name: String,
    pub price: Decimal,
    pub currency: String,
    pub product_url: String,
    pub attributes: Option<serde_json::Value>,
}

impl PriceCreate {
    /// Tags a scraped item with the query term and source that produced it.
    #[must_use]
    pub fn from_scraped(item: ScrapedItem, query_term: &str, source_id: i64) -> Self {
        Self {
            query_term: query_term.to_string(),
            source_id,
            source_product_name: item.product_name,
            price: item.price,
            currency: item.currency,
            product_url: item.product_url,
            attributes: item.attributes,
        }
    }
}

/// Projection served to HTTP clients and stored in the result cache.
///
/// Denormalizes the source name so cached payloads are readable without a
/// store round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub source_name: String,
    pub source_product_name: String,
    pub price: Decimal,
    pub currency: String,
    pub product_url: String,
    pub scraped_at: DateTime<Utc>,
}
