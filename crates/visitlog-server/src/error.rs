use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-fatal errors. Geo failures never reach this type; they degrade to
/// `"unknown"` fields inside the handler.
///
/// Every variant maps to a 500 with a generic `{ "error": "..." }` body. The
/// underlying error is logged, never returned to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(anyhow::Error),

    #[error("store operation failed: {0}")]
    Store(anyhow::Error),
}

impl AppError {
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::StoreUnavailable(_) => "Database connection failed",
            AppError::Store(_) => "Database operation failed",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::StoreUnavailable(e) => {
                tracing::error!(error = %e, "Store connection failed")
            }
            AppError::Store(e) => tracing::error!(error = %e, "Store operation failed"),
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}
