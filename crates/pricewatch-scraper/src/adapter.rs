//! Static registry of site adapters, keyed by source name.
//!
//! Each adapter is a black box turning a query into scraped items with one
//! fetch against the site's public search endpoint. Selection is by the
//! source's `name` column; sources without a registered adapter are skipped
//! by the coordinator.

use pricewatch_core::ScrapedItem;

use crate::error::ScraperError;
use crate::price::retain_valid;
use crate::types::{ScrapeConfig, ScrapeInput};
use crate::{falabella, mercadolibre};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    MercadoLibre,
    Falabella,
}

impl Adapter {
    /// Looks up the adapter registered for a source name.
    ///
    /// Matching is case-insensitive so administratively created sources like
    /// `MercadoLibre` and `mercadolibre` resolve to the same adapter.
    #[must_use]
    pub fn for_source_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "mercadolibre" => Some(Self::MercadoLibre),
            "falabella" => Some(Self::Falabella),
            _ => None,
        }
    }

    /// Names this registry answers to.
    #[must_use]
    pub fn registered_names() -> &'static [&'static str] {
        &["mercadolibre", "falabella"]
    }

    /// Runs one scrape: fetch the site's search endpoint, map the response
    /// to [`ScrapedItem`]s, and drop items failing validation.
    ///
    /// An empty result list is not an error; it means the site answered but
    /// listed nothing for the query.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] on transport failure, a non-success HTTP
    /// status after retries, or an unparseable response body.
    pub async fn scrape(
        self,
        config: &ScrapeConfig,
        input: &ScrapeInput,
    ) -> Result<Vec<ScrapedItem>, ScraperError> {
        let items = match self {
            Self::MercadoLibre => mercadolibre::scrape(config, input).await?,
            Self::Falabella => falabella::scrape(config, input).await?,
        };

        Ok(retain_valid(items, &input.source_name))
    }
}

/// Builds `{base_url}/{path}?{param}={query}` with a percent-encoded query.
pub(crate) fn search_url(base_url: &str, path: &str, param: &str, query: &str) -> String {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

    let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
    format!(
        "{}/{}?{}={}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/'),
        param,
        encoded
    )
}
