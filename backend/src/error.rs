//! HTTP error mapping
//!
//! Every failure leaves the server as `{"detail": "<message>"}` with the
//! status code of its [`ApiError`] variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use game_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by query handlers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Unknown or malformed game id
    #[error("Game not found")]
    NotFound,

    /// Game directory exists but holds no readable history yet
    #[error("Game data not found")]
    DataNotFound,

    /// Move number outside `[0, len)` or not an integer
    #[error("Invalid move number")]
    InvalidArgument,

    /// Corrupt history, I/O failure or a failed blocking task
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound | ApiError::DataNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) | StoreError::InvalidGameId(_) => ApiError::NotFound,
            StoreError::DataNotFound(_) => ApiError::DataNotFound,
            StoreError::OutOfRange { .. } => ApiError::InvalidArgument,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            error!("[API] Request failed: {}", cause);
        }
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
