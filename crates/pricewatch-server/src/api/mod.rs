mod jobs;
mod search;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pricewatch_cache::ResultCache;
use pricewatch_core::{AppConfig, Environment};

use crate::middleware::request_id;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: ResultCache,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new("service_unavailable", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "validation_error" => StatusCode::UNPROCESSABLE_ENTITY,
            "not_found" => StatusCode::NOT_FOUND,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    cache: &'static str,
}

pub fn build_app(state: AppState) -> Router {
    let cors = build_cors(&state.config);

    Router::new()
        .route("/health", get(health))
        // The canonical path carries a trailing slash; accept both spellings.
        .route("/api/v1/search", get(search::search_products))
        .route("/api/v1/search/", get(search::search_products))
        .route("/api/v1/jobs/{job_id}", get(jobs::get_scrape_job))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id))
                .layer(cors),
        )
        .with_state(state)
}

fn build_cors(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    if config.cors_origins.is_empty() {
        // No origins configured: open in development, closed elsewhere.
        if config.env == Environment::Development {
            cors.allow_origin(tower_http::cors::Any)
        } else {
            cors
        }
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!(%origin, %error, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        cors.allow_origin(origins)
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (database, cache) = tokio::join!(pricewatch_db::ping(&state.pool), state.cache.ping());

    if let Err(error) = &database {
        tracing::warn!(%error, "health check: database unavailable");
    }
    if let Err(error) = &cache {
        tracing::warn!(%error, "health check: cache unavailable");
    }

    let database_ok = database.is_ok();
    let cache_ok = cache.is_ok();
    let status = if database_ok && cache_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database_ok && cache_ok {
                "ok"
            } else {
                "degraded"
            },
            database: if database_ok { "ok" } else { "unavailable" },
            cache: if cache_ok { "ok" } else { "unavailable" },
        }),
    )
}
