// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tripweaver: coordination core for collaborative trip planning.
//!
//! This crate provides the backend consistency and coordination logic:
//! friend relationships, transactional trip membership, invite tokens,
//! rate limiting, notification fanout, and cascading cleanup, all over an
//! injected document store.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Db;
use events::EventBus;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub bus: EventBus,
}
