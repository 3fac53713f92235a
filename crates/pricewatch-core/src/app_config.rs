use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Immutable process configuration, read once at startup from the
/// environment and passed explicitly to every component.
#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,

    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_db: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    pub redis_host: String,
    pub redis_port: u16,
    pub cache_expiration_secs: u64,

    pub staleness_threshold_secs: u64,
    pub price_retention_days: u32,

    pub scraper_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,

    pub job_sweep_interval_secs: u64,
    pub job_timeout_minutes: u32,

    /// Allowed CORS origins. Empty means "allow any" in development and
    /// "allow none" elsewhere.
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Postgres connection string assembled from the individual settings.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_host,
            self.postgres_port,
            self.postgres_db
        )
    }

    #[must_use]
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("postgres_host", &self.postgres_host)
            .field("postgres_port", &self.postgres_port)
            .field("postgres_user", &self.postgres_user)
            .field("postgres_password", &"[redacted]")
            .field("postgres_db", &self.postgres_db)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("cache_expiration_secs", &self.cache_expiration_secs)
            .field("staleness_threshold_secs", &self.staleness_threshold_secs)
            .field("price_retention_days", &self.price_retention_days)
            .field("scraper_timeout_secs", &self.scraper_timeout_secs)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field("job_sweep_interval_secs", &self.job_sweep_interval_secs)
            .field("job_timeout_minutes", &self.job_timeout_minutes)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}
