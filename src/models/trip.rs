// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip, membership, encryption, and trip-scoped record models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role a member holds on a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripRole {
    Owner,
    Editor,
    Viewer,
}

impl TripRole {
    /// Roles allowed to add members and issue invites.
    pub fn can_invite(&self) -> bool {
        matches!(self, TripRole::Owner | TripRole::Editor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TripRole::Owner => "owner",
            TripRole::Editor => "editor",
            TripRole::Viewer => "viewer",
        }
    }
}

/// Trip document. The `members` and `roles` maps are the principal shared
/// mutable state; their key sets must be equal after every transaction, and
/// all mutation flows through the membership engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub name: String,
    /// Owner uid, used as attribution fallback for membership diffs
    pub owner: String,
    /// uid -> true for every member (BTreeMap for deterministic iteration)
    #[serde(default)]
    pub members: BTreeMap<String, bool>,
    /// uid -> role; key set tracks `members`
    #[serde(default)]
    pub roles: BTreeMap<String, TripRole>,
    pub created_at: String,
}

impl Trip {
    pub fn is_member(&self, uid: &str) -> bool {
        self.members.get(uid).copied().unwrap_or(false)
    }

    pub fn role_of(&self, uid: &str) -> Option<TripRole> {
        self.roles.get(uid).copied()
    }
}

/// Trip-level encryption switch, stored in `trip_encryption` keyed by trip id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionMeta {
    pub enabled: bool,
}

/// Marker that a key must be (or has been) distributed to a member of an
/// encrypted trip. Stored in `encryption_keys` with id `{trip_id}_{uid}`;
/// created at most once per (trip, member) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionKeyRecord {
    pub trip_id: String,
    pub member_uid: String,
    pub pending: bool,
    pub shared_by: String,
    pub shared_at: String,
}

impl EncryptionKeyRecord {
    pub fn doc_id(trip_id: &str, member_uid: &str) -> String {
        format!("{}_{}", trip_id, member_uid)
    }
}

/// Append-only audit record of a trip-level state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub trip_id: String,
    pub entry_type: String,
    pub actor_uid: String,
    pub message: String,
    pub created_at: String,
}

/// Chat message in a trip's chat, stored in `chat_messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub trip_id: String,
    pub sender_uid: String,
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    pub created_at: String,
}

/// Comment on an itinerary item, stored in `item_comments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemComment {
    pub trip_id: String,
    pub item_id: String,
    pub author_uid: String,
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    pub created_at: String,
}
