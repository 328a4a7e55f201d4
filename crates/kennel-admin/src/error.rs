//! # Admin Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kennel_persistence::CacheError;
use thiserror::Error;

/// Admin route errors
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(CacheError),

    #[error("Cache error: {0}")]
    Cache(CacheError),
}

impl From<CacheError> for AdminError {
    fn from(err: CacheError) -> Self {
        if err.is_unavailable() {
            Self::CacheUnavailable(err)
        } else {
            Self::Cache(err)
        }
    }
}

impl AdminError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::CacheUnavailable(_) => "CACHE_UNAVAILABLE",
            Self::Cache(_) => "CACHE_ERROR",
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "code": self.error_code(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for admin handlers
pub type AdminResult<T> = Result<T, AdminError>;
