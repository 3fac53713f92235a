use pricewatch_core::AppConfig;

/// Everything an adapter needs to run one scrape.
#[derive(Debug, Clone)]
pub struct ScrapeInput {
    /// Normalized query term.
    pub query: String,
    pub source_id: i64,
    pub source_name: String,
    /// Base URL of the site, from the source row. Search URLs are built
    /// against this so tests can point adapters at a local mock server.
    pub base_url: String,
}

/// HTTP behavior shared by all adapters.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    /// Base delay for exponential backoff: `base * 2^attempt` seconds.
    pub backoff_base_secs: u64,
}

impl ScrapeConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.scraper_timeout_secs,
            user_agent: config.scraper_user_agent.clone(),
            max_retries: config.scraper_max_retries,
            backoff_base_secs: config.scraper_retry_backoff_base_secs,
        }
    }
}
