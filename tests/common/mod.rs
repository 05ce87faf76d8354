// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tripweaver::config::Config;
use tripweaver::db::{Db, MemoryStore};
use tripweaver::events::{Event, EventBus, EventRouter};
use tripweaver::middleware::auth::create_jwt;
use tripweaver::models::{NotificationPrefs, Trip, TripRole, UserProfile};
use tripweaver::routes::create_router;
use tripweaver::services::{CleanupService, MockPush, NotificationDispatcher};
use tripweaver::AppState;

/// Fresh in-memory database.
#[allow(dead_code)]
pub fn test_db() -> Db {
    Db::new(Arc::new(MemoryStore::new()))
}

/// Event bus whose receiver is kept for assertions.
#[allow(dead_code)]
pub fn test_bus() -> (EventBus, UnboundedReceiver<Event>) {
    EventBus::new()
}

/// Dispatcher + cleanup router over a recording push mock.
#[allow(dead_code)]
pub fn test_event_router(db: &Db) -> (EventRouter, Arc<MockPush>) {
    let push = Arc::new(MockPush::new());
    let router = EventRouter::new(
        NotificationDispatcher::new(db.clone(), push.clone()),
        CleanupService::new(db.clone()),
    );
    (router, push)
}

/// Full app over the in-memory store. Returns the axum router and state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db();
    let (bus, _rx) = EventBus::new();

    let state = Arc::new(AppState { config, db, bus });
    (create_router(state.clone()), state)
}

/// Bearer header value for a test principal.
#[allow(dead_code)]
pub fn bearer_for(uid: &str, email: &str, name: &str, config: &Config) -> String {
    let token = create_jwt(uid, Some(email), Some(name), &config.jwt_signing_key)
        .expect("create test jwt");
    format!("Bearer {}", token)
}

/// Seed a profile with default preferences.
#[allow(dead_code)]
pub async fn seed_profile(db: &Db, uid: &str, email: &str, name: &str) {
    let now = chrono::Utc::now().to_rfc3339();
    db.upsert_profile(&UserProfile {
        uid: uid.to_string(),
        email: email.to_string(),
        display_name: name.to_string(),
        notification_prefs: NotificationPrefs::default(),
        created_at: now.clone(),
        updated_at: now,
    })
    .await
    .expect("seed profile");
}

/// Seed a trip whose owner is its only member.
#[allow(dead_code)]
pub async fn seed_trip(db: &Db, trip_id: &str, name: &str, owner: &str) -> Trip {
    let trip = Trip {
        name: name.to_string(),
        owner: owner.to_string(),
        members: BTreeMap::from([(owner.to_string(), true)]),
        roles: BTreeMap::from([(owner.to_string(), TripRole::Owner)]),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    db.set_trip(trip_id, &trip).await.expect("seed trip");
    trip
}
