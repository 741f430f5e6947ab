use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The remote store or model call failed.
    #[error("{0}")]
    Upstream(String),

    /// The model answered, but not with the JSON shape we asked for.
    #[error("{0}")]
    UpstreamFormat(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Prefixes the message with `context`, keeping the variant.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            AppError::Validation(msg) => AppError::Validation(format!("{context}: {msg}")),
            AppError::NotFound(msg) => AppError::NotFound(format!("{context}: {msg}")),
            AppError::Upstream(msg) => AppError::Upstream(format!("{context}: {msg}")),
            AppError::UpstreamFormat(msg) => AppError::UpstreamFormat(format!("{context}: {msg}")),
            AppError::Internal(e) => AppError::Internal(e.context(context.to_string())),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(e) => {
                AppError::UpstreamFormat(format!("Model returned invalid JSON: {e}"))
            }
            LlmError::EmptyContent => {
                AppError::UpstreamFormat("Model returned empty content".to_string())
            }
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::UpstreamFormat(msg) => {
                tracing::error!("Upstream format error: {msg}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "detail": self.to_string() }));

        (status, body).into_response()
    }
}
