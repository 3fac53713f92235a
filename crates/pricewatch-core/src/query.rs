//! Query-term normalization and validation.
//!
//! A query term is the user's search string after trimming and lower-casing.
//! Every layer below the HTTP boundary (cache keys, store reads, job rows)
//! only ever sees normalized terms.

pub const QUERY_MIN_LEN: usize = 3;
pub const QUERY_MAX_LEN: usize = 100;

/// Trims surrounding whitespace and lower-cases the query.
///
/// Idempotent: normalizing an already-normalized term is a no-op.
#[must_use]
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query must be at least {QUERY_MIN_LEN} characters, got {0}")]
    TooShort(usize),

    #[error("query must be at most {QUERY_MAX_LEN} characters, got {0}")]
    TooLong(usize),
}

/// Normalizes `raw` and rejects terms outside `[QUERY_MIN_LEN, QUERY_MAX_LEN]`.
///
/// Length is counted in characters, not bytes.
///
/// # Errors
///
/// Returns [`QueryError`] when the normalized term is too short or too long.
pub fn validate_query(raw: &str) -> Result<String, QueryError> {
    let normalized = normalize_query(raw);
    let len = normalized.chars().count();
    if len < QUERY_MIN_LEN {
        return Err(QueryError::TooShort(len));
    }
    if len > QUERY_MAX_LEN {
        return Err(QueryError::TooLong(len));
    }
    Ok(normalized)
}
