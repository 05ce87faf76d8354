// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-token guard for the store-event ingress and admin routes.
//!
//! These routes are called by the document store's event push and by
//! operators, never by end users; a static bearer token authenticates
//! them.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Require the configured ingress bearer token.
pub async fn require_ingress_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == state.config.events_ingress_token => Ok(next.run(request).await),
        _ => {
            tracing::warn!("Blocked ingress request with missing or invalid token");
            Err(StatusCode::FORBIDDEN)
        }
    }
}
