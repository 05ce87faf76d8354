// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip membership transaction engine.
//!
//! The sole writer path for a trip's `members`/`roles` maps. Membership
//! addition, conditional encryption-key provisioning, the audit-log append,
//! and (on the token path) invite closure commit as one conflict-checked
//! transaction; a conflicting concurrent write forces a retry of the whole
//! body from fresh reads.

use crate::db::store::StoreError;
use crate::db::{collections, from_doc, to_doc, Db};
use crate::error::{AppError, Result};
use crate::events::{Event, EventBus};
use crate::models::{
    ActivityLogEntry, EncryptionKeyRecord, EncryptionMeta, InviteStatus, InviteToken, Trip,
    TripRole,
};

/// Transaction retry bound; exhaustion surfaces as `Internal`.
const MAX_TX_ATTEMPTS: u32 = 5;

/// Result of an `add_member` call.
#[derive(Debug, Clone, Copy)]
pub struct AddMemberOutcome {
    /// False when the target was already a member (idempotent no-op).
    pub added: bool,
}

#[derive(Clone)]
pub struct MembershipEngine {
    db: Db,
    bus: EventBus,
}

impl MembershipEngine {
    pub fn new(db: Db, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Direct-invite path: an existing owner/editor adds a known user.
    pub async fn invite_friend(
        &self,
        trip_id: &str,
        caller_uid: &str,
        friend_uid: &str,
        role: TripRole,
    ) -> Result<AddMemberOutcome> {
        if role == TripRole::Owner {
            return Err(AppError::InvalidArgument(
                "cannot grant the owner role".to_string(),
            ));
        }
        if self.db.get_profile(friend_uid).await?.is_none() {
            return Err(AppError::NotFound(format!("user {}", friend_uid)));
        }

        self.add_member(
            trip_id,
            caller_uid,
            friend_uid,
            role,
            Some(&[TripRole::Owner, TripRole::Editor]),
            None,
        )
        .await
    }

    /// Atomically add `target_uid` to a trip.
    ///
    /// `required_caller_roles = None` skips the caller role check (the
    /// invite-token path, where the token itself authorizes the addition).
    /// When `close_invite` is set, the invite is re-read inside the
    /// transaction (it must still be pending) and its `accepted` transition
    /// is staged in the same transaction, including the already-member case.
    pub async fn add_member(
        &self,
        trip_id: &str,
        caller_uid: &str,
        target_uid: &str,
        role: TripRole,
        required_caller_roles: Option<&[TripRole]>,
        close_invite: Option<&InviteToken>,
    ) -> Result<AddMemberOutcome> {
        // Outer role check on a possibly stale read; re-validated against
        // the fresh snapshot inside the transaction.
        let trip = self
            .db
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip {}", trip_id)))?;
        self.check_caller_role(&trip, caller_uid, required_caller_roles)?;

        for attempt in 1..=MAX_TX_ATTEMPTS {
            match self
                .try_add_member(
                    trip_id,
                    caller_uid,
                    target_uid,
                    role,
                    required_caller_roles,
                    close_invite,
                )
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(AppError::Store(StoreError::Conflict)) => {
                    tracing::debug!(trip_id, target_uid, attempt, "Membership transaction conflict, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "membership transaction for trip {} exhausted {} attempts",
            trip_id,
            MAX_TX_ATTEMPTS
        )))
    }

    /// One transaction attempt.
    async fn try_add_member(
        &self,
        trip_id: &str,
        caller_uid: &str,
        target_uid: &str,
        role: TripRole,
        required_caller_roles: Option<&[TripRole]>,
        close_invite: Option<&InviteToken>,
    ) -> Result<AddMemberOutcome> {
        let mut tx = self.db.store().begin().await.map_err(AppError::Store)?;

        let trip_doc = tx
            .get(collections::TRIPS, trip_id)
            .await
            .map_err(AppError::Store)?;
        let trip: Trip = match trip_doc {
            Some(value) => from_doc(value)?,
            None => {
                let _ = tx.rollback().await;
                return Err(AppError::NotFound(format!("trip {}", trip_id)));
            }
        };

        if let Err(err) = self.check_caller_role(&trip, caller_uid, required_caller_roles) {
            let _ = tx.rollback().await;
            return Err(err);
        }

        // Re-read the invite inside the transaction: the pre-transaction
        // pending check may be stale, and a concurrent accept of the same
        // token must conflict, not both succeed.
        if let Some(invite) = close_invite {
            let invite_doc = tx
                .get(collections::TRIP_INVITES, &invite.id)
                .await
                .map_err(AppError::Store)?;
            let current: InviteToken = match invite_doc {
                Some(value) => from_doc(value)?,
                None => {
                    let _ = tx.rollback().await;
                    return Err(AppError::NotFound(format!("invite {}", invite.id)));
                }
            };
            if current.status != InviteStatus::Pending {
                let _ = tx.rollback().await;
                return Err(AppError::FailedPrecondition(
                    "invite has already been used or expired".to_string(),
                ));
            }
        }

        if trip.is_member(target_uid) {
            // Idempotent: membership unchanged, but the invite that led
            // here must still reach its terminal state.
            if let Some(invite) = close_invite {
                stage_invite_accepted(&mut tx, invite, target_uid)?;
                tx.commit().await.map_err(AppError::Store)?;
            } else {
                let _ = tx.rollback().await;
            }
            return Ok(AddMemberOutcome { added: false });
        }

        // Build new map values rather than mutating the read snapshot, so
        // a retried attempt starts from a clean fresh read.
        let mut updated = trip.clone();
        updated.members.insert(target_uid.to_string(), true);
        // Never overwrite a role that is already recorded for this uid.
        updated
            .roles
            .entry(target_uid.to_string())
            .or_insert(role);
        tx.set(collections::TRIPS, trip_id, to_doc(&updated)?);

        self.stage_key_provisioning(&mut tx, trip_id, caller_uid, target_uid)
            .await?;

        let now = chrono::Utc::now().to_rfc3339();
        let entry = ActivityLogEntry {
            trip_id: trip_id.to_string(),
            entry_type: "member.add".to_string(),
            actor_uid: caller_uid.to_string(),
            message: format!("{} joined as {}", target_uid, role.as_str()),
            created_at: now,
        };
        tx.set(
            collections::TRIP_ACTIVITIES,
            &crate::db::auto_id(),
            to_doc(&entry)?,
        );

        if let Some(invite) = close_invite {
            stage_invite_accepted(&mut tx, invite, target_uid)?;
        }

        tx.commit().await.map_err(AppError::Store)?;

        tracing::info!(
            trip_id,
            target_uid,
            role = role.as_str(),
            actor = caller_uid,
            "Member added"
        );

        self.bus.publish(Event::TripWritten {
            trip_id: trip_id.to_string(),
            before: Some(trip),
            after: Some(updated),
        });

        Ok(AddMemberOutcome { added: true })
    }

    /// Stage an encryption-key placeholder when the trip has encryption
    /// enabled and no record exists yet for this member.
    async fn stage_key_provisioning(
        &self,
        tx: &mut Box<dyn crate::db::store::StoreTransaction>,
        trip_id: &str,
        caller_uid: &str,
        target_uid: &str,
    ) -> Result<()> {
        let meta_doc = tx
            .get(collections::TRIP_ENCRYPTION, trip_id)
            .await
            .map_err(AppError::Store)?;
        let enabled = match meta_doc {
            Some(value) => from_doc::<EncryptionMeta>(value)?.enabled,
            None => false,
        };
        if !enabled {
            return Ok(());
        }

        let key_id = EncryptionKeyRecord::doc_id(trip_id, target_uid);
        let existing = tx
            .get(collections::ENCRYPTION_KEYS, &key_id)
            .await
            .map_err(AppError::Store)?;
        if existing.is_some() {
            return Ok(());
        }

        let record = EncryptionKeyRecord {
            trip_id: trip_id.to_string(),
            member_uid: target_uid.to_string(),
            pending: true,
            shared_by: caller_uid.to_string(),
            shared_at: chrono::Utc::now().to_rfc3339(),
        };
        tx.set(collections::ENCRYPTION_KEYS, &key_id, to_doc(&record)?);
        Ok(())
    }

    fn check_caller_role(
        &self,
        trip: &Trip,
        caller_uid: &str,
        required: Option<&[TripRole]>,
    ) -> Result<()> {
        let Some(required) = required else {
            return Ok(());
        };
        match trip.role_of(caller_uid) {
            Some(role) if required.contains(&role) => Ok(()),
            _ => Err(AppError::PermissionDenied(format!(
                "{} may not manage members of this trip",
                caller_uid
            ))),
        }
    }
}

fn stage_invite_accepted(
    tx: &mut Box<dyn crate::db::store::StoreTransaction>,
    invite: &InviteToken,
    accepted_by: &str,
) -> Result<()> {
    let mut closed = invite.clone();
    closed.status = InviteStatus::Accepted;
    closed.accepted_by = Some(accepted_by.to_string());
    tx.set(collections::TRIP_INVITES, &closed.id, to_doc(&closed)?);
    Ok(())
}
