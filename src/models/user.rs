// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in the `users` collection, keyed by uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Authenticated principal id (also the document ID)
    pub uid: String,
    /// Normalized email address (trimmed, lowercased)
    pub email: String,
    /// Display name shown to other users
    pub display_name: String,
    /// Per-category push notification switches
    #[serde(default)]
    pub notification_prefs: NotificationPrefs,
    /// When the profile was first created (RFC 3339)
    pub created_at: String,
    /// Last profile update (RFC 3339)
    pub updated_at: String,
}

/// Per-category notification preferences.
///
/// Every switch defaults to on; a profile written before a category
/// existed reads as enabled for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPrefs {
    #[serde(default = "default_on")]
    pub chat_message: bool,
    #[serde(default = "default_on")]
    pub mention: bool,
    #[serde(default = "default_on")]
    pub comment: bool,
    #[serde(default = "default_on")]
    pub friend_request: bool,
    #[serde(default = "default_on")]
    pub trip_invite: bool,
}

fn default_on() -> bool {
    true
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            chat_message: true,
            mention: true,
            comment: true,
            friend_request: true,
            trip_invite: true,
        }
    }
}

impl NotificationPrefs {
    /// Whether the given notification type is enabled.
    /// Unknown types are allowed through rather than dropped.
    pub fn allows(&self, notification_type: &str) -> bool {
        match notification_type {
            "chat_message" => self.chat_message,
            "mention" => self.mention,
            "comment" => self.comment,
            "friend_request" => self.friend_request,
            "trip_invite" => self.trip_invite,
            _ => true,
        }
    }
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
