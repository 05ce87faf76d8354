// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friend request and friend edge models.

use serde::{Deserialize, Serialize};

/// Lifecycle of a friend request. Terminal once accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FriendRequestStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestStatus::Pending => "pending",
            FriendRequestStatus::Accepted => "accepted",
            FriendRequestStatus::Rejected => "rejected",
        }
    }
}

/// Friend request stored in `friend_requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: String,
    pub from_uid: String,
    pub to_uid: String,
    pub status: FriendRequestStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<String>,
}

/// One direction of a friendship, stored in `friends` with document id
/// `{owner_uid}_{friend_uid}`. The symmetric pair is written atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendEdge {
    pub owner_uid: String,
    pub friend_uid: String,
    pub created_at: String,
}

impl FriendEdge {
    /// Composite document id for an edge.
    pub fn doc_id(owner_uid: &str, friend_uid: &str) -> String {
        format!("{}_{}", owner_uid, friend_uid)
    }
}
