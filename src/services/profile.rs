// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile service: idempotent first-sign-in upsert and user search.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::user::normalize_email;
use crate::models::{NotificationPrefs, UserProfile};
use crate::services::ratelimit::{RateLimitOp, RateLimiter};

const SEARCH_RESULT_LIMIT: u32 = 10;
const MIN_SEARCH_TERM_LEN: usize = 2;

#[derive(Clone)]
pub struct ProfileService {
    db: Db,
    limiter: RateLimiter,
}

impl ProfileService {
    pub fn new(db: Db) -> Self {
        let limiter = RateLimiter::new(db.clone());
        Self { db, limiter }
    }

    /// Create the caller's profile on first sign-in, or refresh identity
    /// fields if they changed. Unchanged identity data writes nothing, so
    /// `created_at` never drifts.
    pub async fn ensure_profile(&self, auth: &AuthUser) -> Result<UserProfile> {
        self.limiter
            .check_and_consume(&auth.uid, RateLimitOp::EnsureProfile)
            .await?;

        let email = auth
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| e.contains('@'))
            .ok_or_else(|| {
                AppError::InvalidArgument("identity carries no email address".to_string())
            })?;
        let display_name = auth
            .display_name
            .clone()
            .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

        if let Some(existing) = self.db.get_profile(&auth.uid).await? {
            if existing.email == email && existing.display_name == display_name {
                return Ok(existing);
            }

            let updated = UserProfile {
                email,
                display_name,
                updated_at: chrono::Utc::now().to_rfc3339(),
                ..existing
            };
            self.db.upsert_profile(&updated).await?;
            tracing::info!(uid = %auth.uid, "Profile identity fields refreshed");
            return Ok(updated);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let profile = UserProfile {
            uid: auth.uid.clone(),
            email,
            display_name,
            notification_prefs: NotificationPrefs::default(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.db.upsert_profile(&profile).await?;
        tracing::info!(uid = %auth.uid, "Profile created");
        Ok(profile)
    }

    /// Prefix search over email and display name, at most 10 results.
    pub async fn search_users(&self, caller_uid: &str, term: &str) -> Result<Vec<UserProfile>> {
        self.limiter
            .check_and_consume(caller_uid, RateLimitOp::SearchUsers)
            .await?;

        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_TERM_LEN {
            return Err(AppError::InvalidArgument(format!(
                "search term must be at least {} characters",
                MIN_SEARCH_TERM_LEN
            )));
        }

        let by_email = self
            .db
            .search_profiles_by_prefix("email", &term.to_lowercase(), SEARCH_RESULT_LIMIT)
            .await?;
        let by_name = self
            .db
            .search_profiles_by_prefix("display_name", term, SEARCH_RESULT_LIMIT)
            .await?;

        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::new();
        for profile in by_email.into_iter().chain(by_name) {
            if seen.insert(profile.uid.clone()) {
                results.push(profile);
            }
            if results.len() as u32 >= SEARCH_RESULT_LIMIT {
                break;
            }
        }
        Ok(results)
    }
}
