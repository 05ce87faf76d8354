// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tripweaver API Server
//!
//! Coordination core for collaborative trip planning: friend requests,
//! transactional trip membership, invite tokens, and the notification
//! fanout pipeline, backed by Firestore.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripweaver::{
    config::Config,
    db::{Db, FirestoreStore},
    events::{run_worker, EventBus, EventRouter},
    services::{CleanupService, FcmClient, NotificationDispatcher},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Tripweaver API");

    // Initialize the Firestore-backed document store
    let store = FirestoreStore::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");
    let db = Db::new(Arc::new(store));

    // Push delivery client
    let push = Arc::new(FcmClient::new(config.fcm_server_key.clone()));

    // Event bus and worker: notification dispatch and cascade cleanup run
    // decoupled from request handling.
    let (bus, rx) = EventBus::new();
    let router = EventRouter::new(
        NotificationDispatcher::new(db.clone(), push),
        CleanupService::new(db.clone()),
    );
    tokio::spawn(run_worker(rx, router));
    tracing::info!("Event worker started");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        bus,
    });

    // Build router
    let app = tripweaver::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tripweaver=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
