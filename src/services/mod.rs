// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cleanup;
pub mod friends;
pub mod invites;
pub mod membership;
pub mod notify;
pub mod profile;
pub mod push;
pub mod ratelimit;

pub use cleanup::CleanupService;
pub use friends::{FriendRequestAction, FriendService};
pub use invites::InviteService;
pub use membership::MembershipEngine;
pub use notify::NotificationDispatcher;
pub use profile::ProfileService;
pub use push::{FcmClient, MockPush, PushDelivery, PushNotification};
pub use ratelimit::{RateLimitOp, RateLimiter};
