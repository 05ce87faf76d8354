// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: store abstraction, backends, and the typed wrapper.

pub mod firestore;
pub mod memory;
pub mod store;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::{AppError, Result};
use crate::models::{FriendRequest, InviteToken, NotificationToken, Trip, UserProfile};
use ring::rand::{SecureRandom, SystemRandom};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use store::{DocumentStore, Filter};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const FRIEND_REQUESTS: &str = "friend_requests";
    pub const FRIENDS: &str = "friends";
    pub const TRIPS: &str = "trips";
    pub const TRIP_ENCRYPTION: &str = "trip_encryption";
    pub const ENCRYPTION_KEYS: &str = "encryption_keys";
    pub const TRIP_INVITES: &str = "trip_invites";
    pub const RATE_LIMITS: &str = "rate_limits";
    pub const NOTIFICATION_TOKENS: &str = "notification_tokens";
    /// Append-only trip audit log
    pub const TRIP_ACTIVITIES: &str = "trip_activities";
    pub const CHAT_MESSAGES: &str = "chat_messages";
    pub const ITINERARY_ITEMS: &str = "itinerary_items";
    pub const ITEM_COMMENTS: &str = "item_comments";
    pub const FORECASTS: &str = "forecasts";
}

/// Generate a Firestore-style 20-character document id.
pub fn auto_id() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 20];
    // fill only fails if the system CSPRNG is broken
    rng.fill(&mut bytes).expect("system randomness unavailable");
    bytes
        .iter()
        .map(|b| CHARSET[(*b as usize) % CHARSET.len()] as char)
        .collect()
}

/// Serialize a model into a store document.
pub fn to_doc<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(anyhow::anyhow!("encode: {}", e)))
}

/// Deserialize a store document into a model.
pub fn from_doc<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| AppError::Internal(anyhow::anyhow!("decode: {}", e)))
}

/// Typed database wrapper over an injected [`DocumentStore`] backend.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn DocumentStore>,
}

impl Db {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Raw store handle, for transactions and untyped sweeps.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    async fn get_doc<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        match self.store.get(collection, id).await? {
            Some(value) => Ok(Some(from_doc(value)?)),
            None => Ok(None),
        }
    }

    async fn set_doc<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> Result<()> {
        self.store.set(collection, id, to_doc(value)?).await?;
        Ok(())
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.get_doc(collections::USERS, uid).await
    }

    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        self.set_doc(collections::USERS, &profile.uid, profile).await
    }

    /// Resolve a profile by normalized email.
    pub async fn find_profile_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let mut hits = self
            .store
            .query(collections::USERS, &[Filter::eq("email", email)], Some(1))
            .await?;
        match hits.pop() {
            Some((_, value)) => Ok(Some(from_doc(value)?)),
            None => Ok(None),
        }
    }

    /// Prefix search over one profile field. `\u{f8ff}` is the standard
    /// high-codepoint upper bound for prefix ranges.
    pub async fn search_profiles_by_prefix(
        &self,
        field: &str,
        term: &str,
        limit: u32,
    ) -> Result<Vec<UserProfile>> {
        let upper = format!("{}{}", term, '\u{f8ff}');
        let hits = self
            .store
            .query(
                collections::USERS,
                &[Filter::gte(field, term), Filter::lt(field, upper)],
                Some(limit),
            )
            .await?;
        hits.into_iter().map(|(_, value)| from_doc(value)).collect()
    }

    // ─── Friend Operations ───────────────────────────────────────

    pub async fn get_friend_request(&self, id: &str) -> Result<Option<FriendRequest>> {
        self.get_doc(collections::FRIEND_REQUESTS, id).await
    }

    pub async fn set_friend_request(&self, request: &FriendRequest) -> Result<()> {
        self.set_doc(collections::FRIEND_REQUESTS, &request.id, request)
            .await
    }

    /// Find an existing pending request for a (from, to) pair.
    pub async fn pending_request_between(
        &self,
        from_uid: &str,
        to_uid: &str,
    ) -> Result<Option<FriendRequest>> {
        let mut hits = self
            .store
            .query(
                collections::FRIEND_REQUESTS,
                &[
                    Filter::eq("from_uid", from_uid),
                    Filter::eq("to_uid", to_uid),
                    Filter::eq("status", "pending"),
                ],
                Some(1),
            )
            .await?;
        match hits.pop() {
            Some((_, value)) => Ok(Some(from_doc(value)?)),
            None => Ok(None),
        }
    }

    // ─── Trip Operations ─────────────────────────────────────────

    pub async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>> {
        self.get_doc(collections::TRIPS, trip_id).await
    }

    pub async fn set_trip(&self, trip_id: &str, trip: &Trip) -> Result<()> {
        self.set_doc(collections::TRIPS, trip_id, trip).await
    }

    // ─── Invite Operations ───────────────────────────────────────

    pub async fn set_invite(&self, invite: &InviteToken) -> Result<()> {
        self.set_doc(collections::TRIP_INVITES, &invite.id, invite)
            .await
    }

    /// Look up an invite by token, scoped to a trip.
    pub async fn find_invite_by_token(
        &self,
        trip_id: &str,
        token: &str,
    ) -> Result<Option<InviteToken>> {
        let mut hits = self
            .store
            .query(
                collections::TRIP_INVITES,
                &[Filter::eq("trip_id", trip_id), Filter::eq("token", token)],
                Some(1),
            )
            .await?;
        match hits.pop() {
            Some((_, value)) => Ok(Some(from_doc(value)?)),
            None => Ok(None),
        }
    }

    // ─── Notification Token Operations ───────────────────────────

    /// All delivery endpoints for a user, with their document ids.
    pub async fn tokens_for_user(&self, uid: &str) -> Result<Vec<(String, NotificationToken)>> {
        let hits = self
            .store
            .query(
                collections::NOTIFICATION_TOKENS,
                &[Filter::eq("uid", uid)],
                None,
            )
            .await?;
        hits.into_iter()
            .map(|(id, value)| Ok((id, from_doc(value)?)))
            .collect()
    }

    pub async fn add_notification_token(&self, token: &NotificationToken) -> Result<String> {
        let id = auto_id();
        self.set_doc(collections::NOTIFICATION_TOKENS, &id, token)
            .await?;
        Ok(id)
    }

    pub async fn delete_notification_token(&self, id: &str) -> Result<()> {
        self.store
            .delete(collections::NOTIFICATION_TOKENS, id)
            .await?;
        Ok(())
    }
}
