//! HTTP error responses for concord-rc

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body could not be read (oversized, aborted)
    #[error("Request body rejected: {0}")]
    BodyRejected(#[from] BytesRejection),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// concord-common error
    #[error(transparent)]
    Common(#[from] concord_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use concord_common::Error;

        let (status, error_code, message) = match self {
            ApiError::BodyRejected(rejection) => {
                (rejection.status(), "BODY_REJECTED", rejection.body_text())
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            // Engine defect: the run could not be analyzed
            ApiError::Common(Error::Invariant(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ANALYSIS_FAILED", msg)
            }
            ApiError::Common(Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
