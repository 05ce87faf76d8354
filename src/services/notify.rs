// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification dispatcher.
//!
//! Reacts to document-change events, never to the originating request:
//! every failure here is caught and logged, nothing propagates. Delivery
//! is best-effort, filtered by per-user preferences, and prunes endpoints
//! the push service reports as permanently invalid.

use crate::db::Db;
use crate::models::{ChatMessage, FriendRequest, InviteToken, ItemComment, NotificationPrefs, Trip};
use crate::services::push::{PushDelivery, PushNotification, SendOutcome};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct NotificationDispatcher {
    db: Db,
    push: Arc<dyn PushDelivery>,
}

impl NotificationDispatcher {
    pub fn new(db: Db, push: Arc<dyn PushDelivery>) -> Self {
        Self { db, push }
    }

    /// Deliver one notification to one user, honoring preferences and
    /// self-healing the endpoint set.
    pub async fn dispatch(
        &self,
        target_uid: &str,
        notification: PushNotification,
        data: HashMap<String, String>,
    ) {
        // Preference lookup failure must never block delivery.
        let prefs = match self.db.get_profile(target_uid).await {
            Ok(Some(profile)) => profile.notification_prefs,
            Ok(None) => NotificationPrefs::default(),
            Err(err) => {
                tracing::warn!(uid = target_uid, error = %err, "Preference lookup failed, defaulting to on");
                NotificationPrefs::default()
            }
        };

        let notification_type = data.get("type").cloned().unwrap_or_default();
        if !prefs.allows(&notification_type) {
            tracing::debug!(
                uid = target_uid,
                notification_type,
                "Notification suppressed by preference"
            );
            return;
        }

        let endpoints = match self.db.tokens_for_user(target_uid).await {
            Ok(endpoints) => endpoints,
            Err(err) => {
                tracing::warn!(uid = target_uid, error = %err, "Token lookup failed, skipping send");
                return;
            }
        };
        if endpoints.is_empty() {
            tracing::debug!(uid = target_uid, "No delivery endpoints registered");
            return;
        }

        let tokens: Vec<String> = endpoints.iter().map(|(_, t)| t.token.clone()).collect();
        let outcomes = match self
            .push
            .send_multicast(&tokens, &notification, &data)
            .await
        {
            Ok(outcomes) => outcomes,
            Err(err) => {
                tracing::warn!(uid = target_uid, error = %err, "Push send failed");
                return;
            }
        };

        for ((doc_id, endpoint), outcome) in endpoints.iter().zip(outcomes) {
            match outcome {
                SendOutcome::Delivered => {}
                SendOutcome::InvalidToken => {
                    tracing::info!(
                        uid = target_uid,
                        platform = %endpoint.platform,
                        "Pruning permanently invalid delivery endpoint"
                    );
                    if let Err(err) = self.db.delete_notification_token(doc_id).await {
                        tracing::warn!(uid = target_uid, error = %err, "Failed to prune endpoint");
                    }
                }
                SendOutcome::Failed(reason) => {
                    tracing::debug!(uid = target_uid, reason, "Push delivery failed for endpoint");
                }
            }
        }
    }

    // ─── Trigger Handlers ────────────────────────────────────────

    /// Chat message created: notify every other member, as `mention` for
    /// recipients named in the message's mention list.
    pub async fn on_message_created(&self, message: &ChatMessage) {
        let Some(trip) = self.load_trip(&message.trip_id).await else {
            return;
        };

        for uid in member_uids(&trip) {
            if uid == message.sender_uid {
                continue;
            }
            let notification_type = if message.mentions.contains(&uid) {
                "mention"
            } else {
                "chat_message"
            };
            let notification = PushNotification {
                title: format!("New message in {}", trip.name),
                body: message.text.clone(),
            };
            let data = HashMap::from([
                ("type".to_string(), notification_type.to_string()),
                ("trip_id".to_string(), message.trip_id.clone()),
                ("sender_uid".to_string(), message.sender_uid.clone()),
            ]);
            self.dispatch(&uid, notification, data).await;
        }
    }

    /// Comment on an itinerary item: same recipient and mention rule.
    pub async fn on_comment_created(&self, comment: &ItemComment) {
        let Some(trip) = self.load_trip(&comment.trip_id).await else {
            return;
        };

        for uid in member_uids(&trip) {
            if uid == comment.author_uid {
                continue;
            }
            let notification_type = if comment.mentions.contains(&uid) {
                "mention"
            } else {
                "comment"
            };
            let notification = PushNotification {
                title: format!("New comment in {}", trip.name),
                body: comment.text.clone(),
            };
            let data = HashMap::from([
                ("type".to_string(), notification_type.to_string()),
                ("trip_id".to_string(), comment.trip_id.clone()),
                ("item_id".to_string(), comment.item_id.clone()),
            ]);
            self.dispatch(&uid, notification, data).await;
        }
    }

    pub async fn on_friend_request_created(&self, request: &FriendRequest) {
        let sender_name = match self.db.get_profile(&request.from_uid).await {
            Ok(Some(profile)) => profile.display_name,
            _ => "Someone".to_string(),
        };

        let notification = PushNotification {
            title: "New friend request".to_string(),
            body: format!("{} sent you a friend request", sender_name),
        };
        let data = HashMap::from([
            ("type".to_string(), "friend_request".to_string()),
            ("request_id".to_string(), request.id.clone()),
            ("from_uid".to_string(), request.from_uid.clone()),
        ]);
        self.dispatch(&request.to_uid, notification, data).await;
    }

    /// Email invite created: only deliverable once the email resolves to a
    /// known profile.
    pub async fn on_invite_created(&self, invite: &InviteToken) {
        let profile = match self.db.find_profile_by_email(&invite.email).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::debug!(invite_id = %invite.id, "Invite email has no profile yet");
                return;
            }
            Err(err) => {
                tracing::warn!(invite_id = %invite.id, error = %err, "Invite email lookup failed");
                return;
            }
        };

        let notification = PushNotification {
            title: "Trip invitation".to_string(),
            body: "You have been invited to join a trip".to_string(),
        };
        let data = HashMap::from([
            ("type".to_string(), "trip_invite".to_string()),
            ("trip_id".to_string(), invite.trip_id.clone()),
            ("invite_id".to_string(), invite.id.clone()),
        ]);
        self.dispatch(&profile.uid, notification, data).await;
    }

    /// Trip document written: diff the members maps and notify each newly
    /// added member. The inviter attribution is a heuristic: first
    /// pre-change member in map order, falling back to the owner field.
    pub async fn on_trip_written(
        &self,
        trip_id: &str,
        before: Option<&Trip>,
        after: Option<&Trip>,
    ) {
        let Some(after) = after else {
            return;
        };

        let existing: Vec<String> = before.map(member_uids).unwrap_or_default();
        let inviter = existing
            .first()
            .cloned()
            .unwrap_or_else(|| after.owner.clone());

        for uid in member_uids(after) {
            if existing.contains(&uid) || uid == inviter {
                continue;
            }
            let notification = PushNotification {
                title: format!("Added to {}", after.name),
                body: format!("You were added to the trip {}", after.name),
            };
            let data = HashMap::from([
                ("type".to_string(), "trip_invite".to_string()),
                ("trip_id".to_string(), trip_id.to_string()),
                ("inviter_uid".to_string(), inviter.clone()),
            ]);
            self.dispatch(&uid, notification, data).await;
        }
    }

    async fn load_trip(&self, trip_id: &str) -> Option<Trip> {
        match self.db.get_trip(trip_id).await {
            Ok(Some(trip)) => Some(trip),
            Ok(None) => {
                tracing::debug!(trip_id, "Trip gone before notification");
                None
            }
            Err(err) => {
                tracing::warn!(trip_id, error = %err, "Trip lookup failed in dispatcher");
                None
            }
        }
    }
}

fn member_uids(trip: &Trip) -> Vec<String> {
    trip.members
        .iter()
        .filter(|(_, active)| **active)
        .map(|(uid, _)| uid.clone())
        .collect()
}
