// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Store-event ingress and operator admin routes.
//!
//! The document store pushes document-change notifications here; payloads
//! are mapped onto the typed event bus by collection and change kind.
//! Internal writers publish on the same bus directly. Both routes sit
//! behind the shared-token ingress guard (see routes/mod.rs).

use crate::db::collections;
use crate::error::{AppError, Result};
use crate::events::Event;
use crate::services::CleanupService;
use crate::AppState;
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/document", post(handle_document_event))
        .route("/admin/sweep-orphaned-keys", post(sweep_orphaned_keys))
}

/// Change kind reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Written,
    Deleted,
}

/// Document-change notification pushed by the store.
#[derive(Deserialize)]
pub struct DocumentEventPayload {
    pub collection: String,
    pub kind: ChangeKind,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub before: Option<Value>,
    #[serde(default)]
    pub after: Option<Value>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    /// True when the payload matched no trigger and was dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
}

fn decoded<T: serde::de::DeserializeOwned>(value: Option<Value>, what: &str) -> Result<T> {
    let value = value
        .ok_or_else(|| AppError::InvalidArgument(format!("missing {} document", what)))?;
    serde_json::from_value(value)
        .map_err(|e| AppError::InvalidArgument(format!("malformed {} document: {}", what, e)))
}

/// Map a store change notification onto the event bus.
async fn handle_document_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DocumentEventPayload>,
) -> Result<Json<IngestResponse>> {
    let event = match (payload.collection.as_str(), payload.kind) {
        (collections::CHAT_MESSAGES, ChangeKind::Created) => Some(Event::MessageCreated {
            message: decoded(payload.after, "chat message")?,
        }),
        (collections::ITEM_COMMENTS, ChangeKind::Created) => Some(Event::CommentCreated {
            comment: decoded(payload.after, "comment")?,
        }),
        (collections::FRIEND_REQUESTS, ChangeKind::Created) => Some(Event::FriendRequestCreated {
            request: decoded(payload.after, "friend request")?,
        }),
        (collections::TRIP_INVITES, ChangeKind::Created) => Some(Event::InviteCreated {
            invite: decoded(payload.after, "invite")?,
        }),
        (collections::TRIPS, ChangeKind::Written) => {
            let trip_id = payload
                .id
                .ok_or_else(|| AppError::InvalidArgument("missing trip id".to_string()))?;
            let before = match payload.before {
                Some(value) => Some(decoded(Some(value), "trip (before)")?),
                None => None,
            };
            let after = match payload.after {
                Some(value) => Some(decoded(Some(value), "trip (after)")?),
                None => None,
            };
            Some(Event::TripWritten {
                trip_id,
                before,
                after,
            })
        }
        (collections::TRIPS, ChangeKind::Deleted) => {
            let trip_id = payload
                .id
                .ok_or_else(|| AppError::InvalidArgument("missing trip id".to_string()))?;
            Some(Event::TripDeleted { trip_id })
        }
        _ => None,
    };

    match event {
        Some(event) => {
            state.bus.publish(event);
            Ok(Json(IngestResponse {
                ok: true,
                ignored: None,
            }))
        }
        None => {
            tracing::debug!(
                collection = %payload.collection,
                "Ignoring document event with no registered trigger"
            );
            Ok(Json(IngestResponse {
                ok: true,
                ignored: Some(true),
            }))
        }
    }
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub ok: bool,
    pub deleted: usize,
}

/// Operator-invoked reconciliation of orphaned encryption-key records.
async fn sweep_orphaned_keys(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepResponse>> {
    let deleted = CleanupService::new(state.db.clone())
        .sweep_orphaned_keys()
        .await?;
    Ok(Json(SweepResponse { ok: true, deleted }))
}
