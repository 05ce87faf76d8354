// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Callable RPC surface for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::TripRole;
use crate::services::{FriendRequestAction, FriendService, InviteService, MembershipEngine, ProfileService};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile/ensure", post(ensure_profile))
        .route("/api/users/search", get(search_users))
        .route("/api/friends/requests", post(send_friend_request))
        .route(
            "/api/friends/requests/{request_id}/respond",
            post(respond_to_friend_request),
        )
        .route("/api/trips/{trip_id}/members", post(invite_friend_to_trip))
        .route("/api/trips/{trip_id}/invites", post(create_trip_invite))
        .route(
            "/api/trips/{trip_id}/invites/accept",
            post(accept_trip_invite),
        )
}

fn validate<T: Validate>(body: &T) -> Result<()> {
    body.validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Idempotently create or refresh the caller's profile from identity claims.
async fn ensure_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<OkResponse>> {
    ProfileService::new(state.db.clone())
        .ensure_profile(&user)
        .await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Serialize)]
pub struct UserSummary {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub users: Vec<UserSummary>,
}

async fn search_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let users = ProfileService::new(state.db.clone())
        .search_users(&user.uid, &query.q)
        .await?
        .into_iter()
        .map(|p| UserSummary {
            uid: p.uid,
            email: p.email,
            display_name: p.display_name,
        })
        .collect();
    Ok(Json(SearchResponse { users }))
}

// ─── Friends ─────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct SendFriendRequestBody {
    #[validate(email)]
    pub to_email: String,
}

#[derive(Serialize)]
pub struct SendFriendRequestResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already: Option<bool>,
}

async fn send_friend_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SendFriendRequestBody>,
) -> Result<Json<SendFriendRequestResponse>> {
    validate(&body)?;
    let outcome = FriendService::new(state.db.clone(), state.bus.clone())
        .send_friend_request(&user.uid, &body.to_email)
        .await?;
    Ok(Json(SendFriendRequestResponse {
        ok: true,
        already: outcome.already.then_some(true),
    }))
}

#[derive(Deserialize)]
pub struct RespondBody {
    pub action: String,
}

#[derive(Serialize)]
pub struct RespondResponse {
    pub ok: bool,
    pub status: String,
}

async fn respond_to_friend_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
    Json(body): Json<RespondBody>,
) -> Result<Json<RespondResponse>> {
    let action = FriendRequestAction::parse(&body.action)?;
    let status = FriendService::new(state.db.clone(), state.bus.clone())
        .respond_to_friend_request(&user.uid, &request_id, action)
        .await?;
    Ok(Json(RespondResponse {
        ok: true,
        status: status.as_str().to_string(),
    }))
}

// ─── Trip Membership ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct InviteFriendBody {
    pub friend_uid: String,
    pub role: TripRole,
}

async fn invite_friend_to_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    Json(body): Json<InviteFriendBody>,
) -> Result<Json<OkResponse>> {
    if body.friend_uid.is_empty() {
        return Err(AppError::InvalidArgument("missing friend_uid".to_string()));
    }
    MembershipEngine::new(state.db.clone(), state.bus.clone())
        .invite_friend(&trip_id, &user.uid, &body.friend_uid, body.role)
        .await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize, Validate)]
pub struct CreateInviteBody {
    #[validate(email)]
    pub email: String,
    pub role: TripRole,
    pub ttl_hours: i64,
}

#[derive(Serialize)]
pub struct CreateInviteResponse {
    pub ok: bool,
    pub invite_id: String,
    pub token: String,
}

async fn create_trip_invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    Json(body): Json<CreateInviteBody>,
) -> Result<Json<CreateInviteResponse>> {
    validate(&body)?;
    let created = InviteService::new(state.db.clone(), state.bus.clone())
        .create_invite(&trip_id, &user.uid, &body.email, body.role, body.ttl_hours)
        .await?;
    Ok(Json(CreateInviteResponse {
        ok: true,
        invite_id: created.invite_id,
        token: created.token,
    }))
}

#[derive(Deserialize)]
pub struct AcceptInviteBody {
    pub token: String,
}

async fn accept_trip_invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    Json(body): Json<AcceptInviteBody>,
) -> Result<Json<OkResponse>> {
    InviteService::new(state.db.clone(), state.bus.clone())
        .accept_invite(&trip_id, &user.uid, &body.token)
        .await?;
    Ok(Json(OkResponse { ok: true }))
}
