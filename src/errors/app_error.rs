//! HTTP-facing error type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::core::telephony::TwilioError;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request is missing or has invalid parameters
    #[error("{0}")]
    BadRequest(String),

    /// A required server setting is not configured
    #[error("{0}")]
    NotConfigured(String),

    /// An upstream provider rejected or failed the request
    #[error("{0}")]
    Upstream(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        }
    }
}

impl From<TwilioError> for AppError {
    fn from(err: TwilioError) -> Self {
        match err {
            TwilioError::MissingCredentials(_) => AppError::NotConfigured(err.to_string()),
            TwilioError::InvalidRequest(_) => AppError::BadRequest(err.to_string()),
            TwilioError::Api { .. } | TwilioError::Http(_) => AppError::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, "{}", self);
        } else {
            tracing::debug!(code, "{}", self);
        }

        (
            status,
            Json(json!({
                "error": code,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
