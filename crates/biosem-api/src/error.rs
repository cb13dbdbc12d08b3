//! API error handling
//!
//! Every failure leaves the server as `{"error": message, "code": CODE}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use biosem_core::BioError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable message
    #[schema(example = "Query parameter required")]
    pub error: String,
    /// Machine-readable error code
    #[schema(example = "BAD_REQUEST")]
    pub code: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unavailable(String),
    Upstream(String),
    Timeout(String),
    Internal(String),
}

impl AppError {
    fn parts(self) -> (StatusCode, ApiError) {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::new("SERVICE_UNAVAILABLE", msg),
            ),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, ApiError::new("UPSTREAM_ERROR", msg)),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, ApiError::new("TIMEOUT", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.parts();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %error.error, "Request failed");
        }
        (status, Json(error)).into_response()
    }
}

impl From<BioError> for AppError {
    fn from(err: BioError) -> Self {
        let message = err.to_string();
        match err {
            BioError::Validation(msg) => AppError::BadRequest(msg),
            BioError::Unavailable(_) => AppError::Unavailable(message),
            BioError::VectorStore(_) | BioError::Embedding(_) => AppError::Upstream(message),
            BioError::Timeout(_) => AppError::Timeout(message),
            BioError::DimensionMismatch { .. } | BioError::Config(_) | BioError::Other(_) => {
                AppError::Internal(message)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
