//! Application error types and HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::shopify::ShopifyError;

/// Top-level application error.
///
/// Every route handler returns `Result<_, AppError>`; the `IntoResponse`
/// impl maps each variant to a status code and captures server-class
/// errors to Sentry.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database/repository error.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify Admin API error.
    #[error("shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Request is missing or carries invalid authentication context.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Client sent an invalid request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal error that should not normally happen.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status code this error maps to.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Database(_) | Self::Shopify(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            sentry::capture_error(&self);
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        // Client-facing message stays generic for server errors.
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Unauthorized("no session".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::BadRequest("daysBack out of range".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("shop".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("oops".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_not_found_maps_to_404() {
        let err = AppError::Database(RepositoryError::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
