// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-(user, operation) fixed-window rate limiter.

use crate::db::{collections, from_doc, to_doc, Db};
use crate::error::{AppError, Result};
use crate::models::RateLimitCounter;

/// Operations gated by the limiter, with static ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOp {
    EnsureProfile,
    SendFriendRequest,
    CreateInvite,
    SearchUsers,
}

impl RateLimitOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitOp::EnsureProfile => "ensure_profile",
            RateLimitOp::SendFriendRequest => "send_friend_request",
            RateLimitOp::CreateInvite => "create_invite",
            RateLimitOp::SearchUsers => "search_users",
        }
    }

    /// (ceiling, window length in ms)
    pub fn policy(&self) -> (u32, i64) {
        match self {
            RateLimitOp::EnsureProfile => (5, 60_000),
            RateLimitOp::SendFriendRequest => (10, 60_000),
            RateLimitOp::CreateInvite => (10, 60_000),
            RateLimitOp::SearchUsers => (20, 60_000),
        }
    }
}

/// Fixed-window counter over the document store.
///
/// The read-then-increment pair is intentionally not transactional:
/// concurrent callers on the same key can race past the ceiling by at most
/// the number of concurrent racers. Contention on one (uid, operation) key
/// is assumed low enough for that margin to be acceptable.
#[derive(Clone)]
pub struct RateLimiter {
    db: Db,
}

impl RateLimiter {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Allow the call and consume one unit, or fail `ResourceExhausted`.
    pub async fn check_and_consume(&self, uid: &str, op: RateLimitOp) -> Result<()> {
        let (ceiling, window_ms) = op.policy();
        let doc_id = RateLimitCounter::doc_id(uid, op.as_str());
        let now_ms = chrono::Utc::now().timestamp_millis();

        let existing = self
            .db
            .store()
            .get(collections::RATE_LIMITS, &doc_id)
            .await?;
        let counter = match existing {
            Some(value) => Some(from_doc::<RateLimitCounter>(value)?),
            None => None,
        };

        let fresh = |count: u32, window_start: i64| RateLimitCounter {
            uid: uid.to_string(),
            operation: op.as_str().to_string(),
            window_start,
            count,
        };

        match counter {
            None => {
                self.write(&doc_id, &fresh(1, now_ms)).await?;
                Ok(())
            }
            Some(counter) if counter.is_stale(now_ms, window_ms) => {
                self.write(&doc_id, &fresh(1, now_ms)).await?;
                Ok(())
            }
            Some(counter) if counter.count >= ceiling => {
                tracing::warn!(
                    uid,
                    operation = op.as_str(),
                    count = counter.count,
                    ceiling,
                    "Rate limit exceeded"
                );
                Err(AppError::ResourceExhausted { ceiling, window_ms })
            }
            Some(counter) => {
                self.write(&doc_id, &fresh(counter.count + 1, counter.window_start))
                    .await?;
                Ok(())
            }
        }
    }

    async fn write(&self, doc_id: &str, counter: &RateLimitCounter) -> Result<()> {
        self.db
            .store()
            .set(collections::RATE_LIMITS, doc_id, to_doc(counter)?)
            .await?;
        Ok(())
    }
}
