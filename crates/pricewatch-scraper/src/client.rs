//! Per-scrape HTTP client shared by all adapters.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::ScraperError;
use crate::retry::retry_with_backoff;
use crate::types::ScrapeConfig;

/// HTTP client for one scrape. Constructed when the scrape starts and
/// dropped when it completes, closing its connections with it.
///
/// Transient failures (429, 5xx, network errors) are retried with
/// exponential backoff; 4xx statuses and malformed bodies are not.
pub struct SiteClient {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl SiteClient {
    /// Builds a client with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &ScrapeConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff_base_secs: config.backoff_base_secs,
        })
    }

    /// Fetches `url` and deserializes the body as JSON into `T`.
    ///
    /// `context` names the payload in deserialization errors.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] — HTTP 429 after all retries.
    /// - [`ScraperError::UnexpectedStatus`] — any other non-2xx status
    ///   (5xx retried, 4xx not).
    /// - [`ScraperError::Http`] — network failure after all retries.
    /// - [`ScraperError::Deserialize`] — body is not valid JSON for `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        context: &str,
    ) -> Result<T, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async {
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status.as_u16() == 429 {
                return Err(ScraperError::RateLimited {
                    url: url.to_owned(),
                });
            }
            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|source| ScraperError::Deserialize {
                context: context.to_owned(),
                source,
            })
        })
        .await
    }
}
