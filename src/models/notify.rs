// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push delivery endpoint model.

use serde::{Deserialize, Serialize};

/// A device/installation delivery endpoint, stored in `notification_tokens`.
/// Created and deleted independently of the profile; the dispatcher prunes
/// endpoints the push service reports as permanently invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationToken {
    pub uid: String,
    pub token: String,
    pub platform: String,
    pub created_at: String,
}
