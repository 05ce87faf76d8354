// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod friend;
pub mod invite;
pub mod notify;
pub mod rate;
pub mod trip;
pub mod user;

pub use friend::{FriendEdge, FriendRequest, FriendRequestStatus};
pub use invite::{InviteStatus, InviteToken};
pub use notify::NotificationToken;
pub use rate::RateLimitCounter;
pub use trip::{
    ActivityLogEntry, ChatMessage, EncryptionKeyRecord, EncryptionMeta, ItemComment, Trip,
    TripRole,
};
pub use user::{NotificationPrefs, UserProfile};
