// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friend relationship manager: request -> accept/reject state machine
//! producing bidirectional friend edges.

use crate::db::store::StoreError;
use crate::db::{auto_id, collections, from_doc, to_doc, Db};
use crate::error::{AppError, Result};
use crate::events::{Event, EventBus};
use crate::models::user::normalize_email;
use crate::models::{FriendEdge, FriendRequest, FriendRequestStatus};
use crate::services::ratelimit::{RateLimitOp, RateLimiter};

const MAX_TX_ATTEMPTS: u32 = 3;

/// Action taken on a pending friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestAction {
    Accept,
    Reject,
}

impl FriendRequestAction {
    pub fn parse(action: &str) -> Result<Self> {
        match action {
            "accept" => Ok(FriendRequestAction::Accept),
            "reject" => Ok(FriendRequestAction::Reject),
            other => Err(AppError::InvalidArgument(format!(
                "unsupported action {:?}",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct FriendService {
    db: Db,
    bus: EventBus,
    limiter: RateLimiter,
}

/// Result of `send_friend_request`.
#[derive(Debug, Clone, Copy)]
pub struct SendRequestOutcome {
    /// True when an equivalent pending request already existed.
    pub already: bool,
}

impl FriendService {
    pub fn new(db: Db, bus: EventBus) -> Self {
        let limiter = RateLimiter::new(db.clone());
        Self { db, bus, limiter }
    }

    /// Send (or idempotently re-send) a friend request by email.
    pub async fn send_friend_request(
        &self,
        from_uid: &str,
        to_email: &str,
    ) -> Result<SendRequestOutcome> {
        self.limiter
            .check_and_consume(from_uid, RateLimitOp::SendFriendRequest)
            .await?;

        let email = normalize_email(to_email);
        if !email.contains('@') {
            return Err(AppError::InvalidArgument(format!(
                "{:?} is not an email address",
                to_email
            )));
        }

        let target = self
            .db
            .find_profile_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no user with email {}", email)))?;

        if target.uid == from_uid {
            return Err(AppError::FailedPrecondition(
                "cannot send a friend request to yourself".to_string(),
            ));
        }

        // Single-pending invariant: an existing pending request for this
        // pair makes this call a no-op.
        if self
            .db
            .pending_request_between(from_uid, &target.uid)
            .await?
            .is_some()
        {
            return Ok(SendRequestOutcome { already: true });
        }

        let request = FriendRequest {
            id: auto_id(),
            from_uid: from_uid.to_string(),
            to_uid: target.uid.clone(),
            status: FriendRequestStatus::Pending,
            created_at: chrono::Utc::now().to_rfc3339(),
            decided_at: None,
        };
        self.db.set_friend_request(&request).await?;

        tracing::info!(from_uid, to_uid = %target.uid, request_id = %request.id, "Friend request created");
        self.bus.publish(Event::FriendRequestCreated { request });

        Ok(SendRequestOutcome { already: false })
    }

    /// Accept or reject a pending request addressed to `uid`.
    ///
    /// Terminal requests are idempotent: the stored status is returned
    /// without another transition. Acceptance writes both edge directions
    /// and the status flip as one atomic set.
    pub async fn respond_to_friend_request(
        &self,
        uid: &str,
        request_id: &str,
        action: FriendRequestAction,
    ) -> Result<FriendRequestStatus> {
        let request = self
            .db
            .get_friend_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("friend request {}", request_id)))?;

        if request.to_uid != uid {
            return Err(AppError::PermissionDenied(
                "friend request is addressed to another user".to_string(),
            ));
        }

        if request.status.is_terminal() {
            return Ok(request.status);
        }

        let now = chrono::Utc::now().to_rfc3339();
        match action {
            FriendRequestAction::Reject => {
                let mut rejected = request;
                rejected.status = FriendRequestStatus::Rejected;
                rejected.decided_at = Some(now);
                self.db.set_friend_request(&rejected).await?;
                tracing::info!(request_id, uid, "Friend request rejected");
                Ok(FriendRequestStatus::Rejected)
            }
            FriendRequestAction::Accept => {
                self.accept(&request, &now).await?;
                tracing::info!(request_id, uid, "Friend request accepted");
                Ok(FriendRequestStatus::Accepted)
            }
        }
    }

    /// Atomically create both edge directions and mark the request accepted.
    async fn accept(&self, request: &FriendRequest, now: &str) -> Result<()> {
        for _attempt in 0..MAX_TX_ATTEMPTS {
            let mut tx = self.db.store().begin().await.map_err(AppError::Store)?;

            // Fresh read guards against a concurrent responder.
            let current = tx
                .get(collections::FRIEND_REQUESTS, &request.id)
                .await
                .map_err(AppError::Store)?;
            let current: FriendRequest = match current {
                Some(value) => from_doc(value)?,
                None => {
                    let _ = tx.rollback().await;
                    return Err(AppError::NotFound(format!("friend request {}", request.id)));
                }
            };
            if current.status.is_terminal() {
                let _ = tx.rollback().await;
                return Ok(());
            }

            for (owner, friend) in [
                (&request.from_uid, &request.to_uid),
                (&request.to_uid, &request.from_uid),
            ] {
                let edge = FriendEdge {
                    owner_uid: owner.to_string(),
                    friend_uid: friend.to_string(),
                    created_at: now.to_string(),
                };
                tx.set(
                    collections::FRIENDS,
                    &FriendEdge::doc_id(owner, friend),
                    to_doc(&edge)?,
                );
            }

            let mut accepted = current;
            accepted.status = FriendRequestStatus::Accepted;
            accepted.decided_at = Some(now.to_string());
            tx.set(
                collections::FRIEND_REQUESTS,
                &accepted.id,
                to_doc(&accepted)?,
            );

            match tx.commit().await {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict) => continue,
                Err(err) => return Err(AppError::Store(err)),
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "friend request {} acceptance exhausted retries",
            request.id
        )))
    }
}
