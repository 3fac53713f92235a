use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use pricewatch_core::{validate_query, SearchResultItem};

use crate::middleware::RequestId;
use crate::search::{SearchCoordinator, SearchError};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    /// Modeled as optional so a missing parameter maps to a 422 instead of
    /// axum's generic 400 rejection.
    query: Option<String>,
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchResponse {
    query: String,
    results: Vec<SearchResultItem>,
    from_cache: bool,
    message: Option<String>,
    job_id: Option<i64>,
}

pub(super) async fn search_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let raw = params
        .query
        .ok_or_else(|| ApiError::validation("query parameter is required"))?;
    let query_term = validate_query(&raw).map_err(|e| ApiError::validation(e.to_string()))?;

    let coordinator = SearchCoordinator::new(
        state.pool.clone(),
        state.cache.clone(),
        std::sync::Arc::clone(&state.config),
    );

    let outcome = coordinator
        .search(&query_term, params.force_refresh)
        .await
        .map_err(|error| match error {
            SearchError::Db(inner) => {
                tracing::error!(
                    request_id = %req_id.0,
                    query = %query_term,
                    error = %inner,
                    "price store unavailable"
                );
                ApiError::service_unavailable("price store unavailable")
            }
            SearchError::Cache(inner) => {
                tracing::error!(
                    request_id = %req_id.0,
                    query = %query_term,
                    error = %inner,
                    "result cache unavailable"
                );
                ApiError::service_unavailable("result cache unavailable")
            }
        })?;

    Ok(Json(SearchResponse {
        query: outcome.query,
        results: outcome.results,
        from_cache: outcome.from_cache,
        message: outcome.message,
        job_id: outcome.job_id,
    }))
}
