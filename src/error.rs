use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::providers::TransportError;

/// Failures that escape the orchestrator. Every variant answers 500 with `{"error": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: TransportError,
    },
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Error in analyze-trends: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
