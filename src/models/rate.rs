// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-window rate limit counter model.

use serde::{Deserialize, Serialize};

/// Per-(uid, operation) request counter, stored in `rate_limits` with
/// document id `{uid}_{operation}`. Fixed window, not sliding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitCounter {
    pub uid: String,
    pub operation: String,
    /// Window start, epoch milliseconds
    pub window_start: i64,
    pub count: u32,
}

impl RateLimitCounter {
    pub fn doc_id(uid: &str, operation: &str) -> String {
        format!("{}_{}", uid, operation)
    }

    /// A window is stale once its age reaches the window length.
    pub fn is_stale(&self, now_ms: i64, window_ms: i64) -> bool {
        now_ms - self.window_start >= window_ms
    }
}
