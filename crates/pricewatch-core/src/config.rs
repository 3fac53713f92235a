use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the actual environment so tests
/// can drive this with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default =
        |var: &str, default: &str| lookup(var).unwrap_or_else(|_| default.to_string());

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u16_required = |var: &str| -> Result<u16, ConfigError> {
        require(var)?
            .parse::<u16>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let postgres_host = require("POSTGRES_HOST")?;
    let postgres_port = parse_u16_required("POSTGRES_PORT")?;
    let postgres_user = require("POSTGRES_USER")?;
    let postgres_password = require("POSTGRES_PASSWORD")?;
    let postgres_db = require("POSTGRES_DB")?;

    let redis_host = require("REDIS_HOST")?;
    let redis_port = parse_u16_required("REDIS_PORT")?;

    let env = parse_environment(&or_default("ENVIRONMENT", "development"));

    let bind_addr_raw = or_default("BIND_ADDR", "0.0.0.0:8000");
    let bind_addr = bind_addr_raw
        .parse::<SocketAddr>()
        .map_err(|e| invalid("BIND_ADDR", e.to_string()))?;

    let log_level = or_default("LOG_LEVEL", "info");

    let cors_origins = or_default("CORS_ORIGINS", "")
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        postgres_host,
        postgres_port,
        postgres_user,
        postgres_password,
        postgres_db,
        db_max_connections: parse_u32("DB_MAX_CONNECTIONS", "10")?,
        db_min_connections: parse_u32("DB_MIN_CONNECTIONS", "1")?,
        db_acquire_timeout_secs: parse_u64("DB_ACQUIRE_TIMEOUT_SECS", "10")?,
        redis_host,
        redis_port,
        cache_expiration_secs: parse_u64("CACHE_EXPIRATION_SECONDS", "3600")?,
        staleness_threshold_secs: parse_u64("STALENESS_THRESHOLD_SECONDS", "3600")?,
        price_retention_days: parse_u32("PRICE_RETENTION_DAYS", "30")?,
        scraper_timeout_secs: parse_u64("SCRAPER_TIMEOUT_SECONDS", "30")?,
        scraper_user_agent: or_default(
            "SCRAPER_USER_AGENT",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        ),
        scraper_max_retries: parse_u32("SCRAPER_MAX_RETRIES", "3")?,
        scraper_retry_backoff_base_secs: parse_u64("SCRAPER_RETRY_BACKOFF_BASE_SECS", "1")?,
        job_sweep_interval_secs: parse_u64("JOB_SWEEP_INTERVAL_SECONDS", "300")?,
        job_timeout_minutes: parse_u32("JOB_TIMEOUT_MINUTES", "30")?,
        cors_origins,
    })
}

/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
