//! Exponential-backoff retry for transient scrape errors.
//!
//! Only conditions that can plausibly clear on their own are retried: 429s,
//! 5xx statuses, and network-level failures. Client errors and malformed
//! bodies are propagated immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        ScraperError::Deserialize { .. } | ScraperError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation`, sleeping `backoff_base_secs * 2^attempt` seconds between
/// attempts on retriable errors, up to `max_retries` additional attempts.
/// The last error is returned when retries are exhausted.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !is_retriable(&error) || attempt >= max_retries {
                    return Err(error);
                }
                error
            }
        };

        // Cap the shift so extreme configs cannot overflow.
        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            %error,
            "transient scrape error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
