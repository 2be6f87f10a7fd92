use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use huniankita_store::StoreError;

use crate::gate::GateError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient tokens: {shortfall} more needed")]
    InsufficientTokens { shortfall: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("File too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::InsufficientTokens { .. } => {
                (StatusCode::PAYMENT_REQUIRED, self.to_string())
            }
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = match &self {
            ApiError::InsufficientTokens { shortfall } => serde_json::json!({
                "error": message,
                "shortfall": shortfall,
            }),
            _ => serde_json::json!({
                "error": message,
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound("Record not found".into()),
            StoreError::AlreadyExists => ApiError::Conflict("Record already exists".into()),
            // A conditional debit lost its race after the check passed.
            StoreError::InsufficientBalance => {
                ApiError::Conflict("Token balance changed, please retry".into())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::InsufficientTokens { shortfall } => {
                ApiError::InsufficientTokens { shortfall }
            }
            GateError::Forbidden(msg) => ApiError::Forbidden(msg),
            GateError::InvalidAmount(amount) => {
                ApiError::BadRequest(format!("Invalid amount: {amount}"))
            }
            GateError::ConcurrentModification => {
                ApiError::Conflict("Token balance changed, please retry".into())
            }
            GateError::Store(store) => store.into(),
        }
    }
}
