// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email invite token model.

use serde::{Deserialize, Serialize};

/// Invite status. Transitions `pending -> {accepted, expired}` exactly
/// once; any terminal status blocks reuse of the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
}

/// Time-boxed, single-use credential granting a role on a trip to whoever
/// redeems the token. Stored in `trip_invites`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteToken {
    pub id: String,
    pub trip_id: String,
    /// Normalized invitee email
    pub email: String,
    /// Unguessable token string (40 chars, cryptographically random)
    pub token: String,
    pub role: crate::models::TripRole,
    pub status: InviteStatus,
    pub invited_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    pub created_at: String,
    /// RFC 3339 expiry; compared lazily at acceptance time
    pub expires_at: String,
}

impl InviteToken {
    /// Whether the stored expiry has passed relative to `now`.
    pub fn is_expired_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match chrono::DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expiry) => expiry.with_timezone(&chrono::Utc) <= now,
            // Unparseable expiry counts as expired rather than immortal.
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TripRole;

    fn invite(expires_at: &str) -> InviteToken {
        InviteToken {
            id: "i1".into(),
            trip_id: "t1".into(),
            email: "bob@example.com".into(),
            token: "tok".into(),
            role: TripRole::Viewer,
            status: InviteStatus::Pending,
            invited_by: "alice".into(),
            accepted_by: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            expires_at: expires_at.into(),
        }
    }

    #[test]
    fn expiry_comparison() {
        let now = chrono::Utc::now();
        let past = (now - chrono::Duration::hours(1)).to_rfc3339();
        let future = (now + chrono::Duration::hours(1)).to_rfc3339();

        assert!(invite(&past).is_expired_at(now));
        assert!(!invite(&future).is_expired_at(now));
        assert!(invite("not-a-date").is_expired_at(now));
    }
}
