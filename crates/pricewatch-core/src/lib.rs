pub mod app_config;
pub mod config;
pub mod items;
pub mod query;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use items::{PriceCreate, ScrapedItem, SearchResultItem, DEFAULT_CURRENCY};
pub use query::{normalize_query, validate_query, QueryError, QUERY_MAX_LEN, QUERY_MIN_LEN};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
