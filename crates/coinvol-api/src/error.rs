//! Read-path error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coinvol_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// No ingestion cycle has published a marker yet.
    #[error("No latest update data available")]
    NoBatchMarker,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// HTTP-facing error. Bodies are a bare JSON string.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No latest update data available")]
    NoBatchMarker,

    #[error("No data found for coin pair: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Error: {0}")]
    Internal(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::NoBatchMarker => ApiError::NoBatchMarker,
            QueryError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoBatchMarker | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NoBatchMarker.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::NotFound("x/usd".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(QueryError::Store(StoreError::Unavailable("down".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            ApiError::NotFound("bitcoin/usd".to_string()).to_string(),
            "No data found for coin pair: bitcoin/usd"
        );
    }
}
