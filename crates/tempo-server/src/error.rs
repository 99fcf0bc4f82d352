use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use tempo_core::errors::GenError;
use tempo_engine::EngineError;

/// API-boundary error. Internal detail goes to tracing; response bodies
/// carry only what the client can act on.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// No generation provider is configured.
    ProviderUnavailable,
    Provider(GenError),
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => ApiError::BadRequest(msg),
            EngineError::NotFound(what) => ApiError::NotFound(what),
            EngineError::InvalidDate(e) => ApiError::BadRequest(e.to_string()),
            EngineError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<GenError> for ApiError {
    fn from(err: GenError) -> Self {
        ApiError::Provider(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("not found: {what}")),
            ApiError::ProviderUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "task generation is not configured".to_string(),
            ),
            ApiError::Provider(err) => {
                tracing::warn!(kind = err.error_kind(), error = %err, "generation failed");
                if err.is_retryable() {
                    (
                        StatusCode::BAD_GATEWAY,
                        "task generation failed, try again".to_string(),
                    )
                } else {
                    (
                        StatusCode::BAD_GATEWAY,
                        "task generation failed".to_string(),
                    )
                }
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
