use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use pricewatch_db::{scrape_jobs, DbError};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ScrapeJobResponse {
    job_id: i64,
    query_term: String,
    source_id: Option<i64>,
    status: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

/// Poll the lifecycle of a refresh job returned by the search endpoint.
pub(super) async fn get_scrape_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<i64>,
) -> Result<Json<ScrapeJobResponse>, ApiError> {
    let row = scrape_jobs::get(&state.pool, job_id)
        .await
        .map_err(|error| match error {
            DbError::NotFound => ApiError::not_found(format!("no scrape job with id {job_id}")),
            other => {
                tracing::error!(
                    request_id = %req_id.0,
                    job_id,
                    error = %other,
                    "failed to read scrape job"
                );
                ApiError::service_unavailable("price store unavailable")
            }
        })?;

    Ok(Json(ScrapeJobResponse {
        job_id: row.job_id,
        query_term: row.query_term,
        source_id: row.source_id,
        status: row.status,
        created_at: row.created_at,
        started_at: row.started_at,
        completed_at: row.completed_at,
        error_message: row.error_message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_response_is_serializable() {
        let response = ScrapeJobResponse {
            job_id: 3,
            query_term: "laptop".to_string(),
            source_id: None,
            status: "RUNNING".to_string(),
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
            error_message: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"RUNNING\""));
        assert!(json.contains("\"completed_at\":null"));
    }
}
