// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// Variants mirror the stable error codes the callable surface returns
/// to clients; anything unexpected collapses to `internal`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Rate limit exceeded: {ceiling} requests per {window_ms}ms")]
    ResourceExhausted { ceiling: u32, window_ms: i64 },

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Database error: {0}")]
    Store(#[from] crate::db::store::StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),
            AppError::InvalidArgument(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid-argument",
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not-found", Some(msg.clone())),
            AppError::PermissionDenied(msg) => {
                (StatusCode::FORBIDDEN, "permission-denied", Some(msg.clone()))
            }
            AppError::FailedPrecondition(msg) => {
                (StatusCode::CONFLICT, "failed-precondition", Some(msg.clone()))
            }
            AppError::ResourceExhausted { ceiling, window_ms } => (
                StatusCode::TOO_MANY_REQUESTS,
                "resource-exhausted",
                Some(format!("limit {} per {}ms", ceiling, window_ms)),
            ),
            AppError::DeadlineExceeded(msg) => {
                (StatusCode::GONE, "deadline-exceeded", Some(msg.clone()))
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "Store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        let cases = [
            (AppError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                AppError::InvalidArgument("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                AppError::PermissionDenied("x".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                AppError::FailedPrecondition("x".into()),
                StatusCode::CONFLICT,
            ),
            (
                AppError::ResourceExhausted {
                    ceiling: 10,
                    window_ms: 60_000,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (AppError::DeadlineExceeded("x".into()), StatusCode::GONE),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
