//! Error type shared by the fetcher, join stage and HTTP handlers.
//!
//! Every failure leaves the gateway as `{ "error": message }` with an HTTP
//! status. There are no structured error codes; callers match on status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A required base URL was not configured at startup
    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    /// Transport-level failure talking to an upstream (connect, DNS, body read)
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Upstream answered but the body did not have the expected shape
    #[error("Failed to decode upstream response from {source_name}: {reason}")]
    Decode { source_name: String, reason: String },

    /// Pagination stopped on a non-success status and the caller asked to fail
    #[error("Fetch of '{collection}' stopped at page {page} with upstream status {status}")]
    Truncated {
        collection: String,
        page: u32,
        status: u16,
    },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingConfig(_)
            | AppError::Upstream(_)
            | AppError::Decode { .. }
            | AppError::Truncated { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::MissingConfig("UPSTREAM_API_BASE_URL").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::BadRequest("nope".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_config_message_names_variable() {
        let err = AppError::MissingConfig("DATA_API_BASE_URL");
        assert_eq!(err.to_string(), "DATA_API_BASE_URL is not configured");
    }
}
