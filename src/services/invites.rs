// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email invite-token lifecycle: issue, validate, lazily expire, and
//! single-use-consume tokens that feed the membership engine.

use crate::db::{auto_id, Db};
use crate::error::{AppError, Result};
use crate::events::{Event, EventBus};
use crate::models::user::normalize_email;
use crate::models::{InviteStatus, InviteToken, TripRole};
use crate::services::membership::MembershipEngine;
use crate::services::ratelimit::{RateLimitOp, RateLimiter};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};

/// Longest TTL an invite may carry (30 days).
const MAX_TTL_HOURS: i64 = 720;

/// 30 random bytes -> 40 base64 chars, comfortably unguessable.
const TOKEN_BYTES: usize = 30;

#[derive(Clone)]
pub struct InviteService {
    db: Db,
    bus: EventBus,
    engine: MembershipEngine,
    limiter: RateLimiter,
}

/// Freshly issued invite.
#[derive(Debug, Clone)]
pub struct CreatedInvite {
    pub invite_id: String,
    pub token: String,
}

impl InviteService {
    pub fn new(db: Db, bus: EventBus) -> Self {
        let engine = MembershipEngine::new(db.clone(), bus.clone());
        let limiter = RateLimiter::new(db.clone());
        Self {
            db,
            bus,
            engine,
            limiter,
        }
    }

    /// Issue a pending invite token for an email address.
    pub async fn create_invite(
        &self,
        trip_id: &str,
        caller_uid: &str,
        email: &str,
        role: TripRole,
        ttl_hours: i64,
    ) -> Result<CreatedInvite> {
        self.limiter
            .check_and_consume(caller_uid, RateLimitOp::CreateInvite)
            .await?;

        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(AppError::InvalidArgument(format!(
                "{:?} is not an email address",
                email
            )));
        }
        if role == TripRole::Owner {
            return Err(AppError::InvalidArgument(
                "an invite cannot grant the owner role".to_string(),
            ));
        }
        if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
            return Err(AppError::InvalidArgument(format!(
                "ttl_hours must be between 1 and {}",
                MAX_TTL_HOURS
            )));
        }

        let trip = self
            .db
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip {}", trip_id)))?;
        match trip.role_of(caller_uid) {
            Some(role) if role.can_invite() => {}
            _ => {
                return Err(AppError::PermissionDenied(
                    "only owners and editors may invite".to_string(),
                ))
            }
        }

        let now = chrono::Utc::now();
        let invite = InviteToken {
            id: auto_id(),
            trip_id: trip_id.to_string(),
            email,
            token: generate_invite_token(),
            role,
            status: InviteStatus::Pending,
            invited_by: caller_uid.to_string(),
            accepted_by: None,
            created_at: now.to_rfc3339(),
            expires_at: (now + chrono::Duration::hours(ttl_hours)).to_rfc3339(),
        };
        self.db.set_invite(&invite).await?;

        tracing::info!(
            trip_id,
            invite_id = %invite.id,
            invited_by = caller_uid,
            role = role.as_str(),
            ttl_hours,
            "Invite created"
        );

        let created = CreatedInvite {
            invite_id: invite.id.clone(),
            token: invite.token.clone(),
        };
        self.bus.publish(Event::InviteCreated { invite });

        Ok(created)
    }

    /// Redeem an invite token for the accepting principal.
    ///
    /// Expiry is evaluated lazily here; the `expired` flip is written
    /// outside the membership transaction so it lands even when the caller
    /// is no longer eligible to join.
    pub async fn accept_invite(&self, trip_id: &str, uid: &str, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(AppError::InvalidArgument("missing invite token".to_string()));
        }

        let invite = self
            .db
            .find_invite_by_token(trip_id, token)
            .await?
            .ok_or_else(|| AppError::NotFound("invite".to_string()))?;

        if invite.status != InviteStatus::Pending {
            return Err(AppError::FailedPrecondition(
                "invite has already been used or expired".to_string(),
            ));
        }

        if invite.is_expired_at(chrono::Utc::now()) {
            let mut expired = invite;
            expired.status = InviteStatus::Expired;
            self.db.set_invite(&expired).await?;
            tracing::info!(trip_id, invite_id = %expired.id, "Invite expired on access");
            return Err(AppError::DeadlineExceeded("invite has expired".to_string()));
        }

        // Token authorizes the addition; the accepted transition commits
        // inside the same membership transaction.
        self.engine
            .add_member(trip_id, uid, uid, invite.role, None, Some(&invite))
            .await?;

        tracing::info!(trip_id, uid, invite_id = %invite.id, "Invite accepted");
        Ok(())
    }
}

/// Generate an unguessable single-use invite token.
pub fn generate_invite_token() -> String {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes).expect("system randomness unavailable");
    URL_SAFE_NO_PAD.encode(bytes)
}
