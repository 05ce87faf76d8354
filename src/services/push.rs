// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push delivery client.
//!
//! The dispatcher talks to a [`PushDelivery`] trait object so tests can
//! record sends without a network; production uses the FCM legacy HTTP
//! endpoint, whose per-token results distinguish permanently invalid
//! registrations from transient failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Visible notification content.
#[derive(Debug, Clone, Serialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

/// Per-token delivery outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The endpoint is permanently gone; its record should be pruned.
    InvalidToken,
    Failed(String),
}

/// Multicast push delivery.
#[async_trait]
pub trait PushDelivery: Send + Sync {
    /// Send one notification to many endpoints; the result vector is
    /// index-aligned with `tokens`.
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &PushNotification,
        data: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<SendOutcome>>;
}

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// FCM legacy HTTP client.
pub struct FcmClient {
    http: reqwest::Client,
    server_key: String,
}

impl FcmClient {
    pub fn new(server_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_key,
        }
    }
}

#[derive(Serialize)]
struct FcmRequest<'a> {
    registration_ids: &'a [String],
    notification: &'a PushNotification,
    data: &'a HashMap<String, String>,
}

#[derive(Deserialize)]
struct FcmResponse {
    results: Vec<FcmResult>,
}

#[derive(Deserialize)]
struct FcmResult {
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl PushDelivery for FcmClient {
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &PushNotification,
        data: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<SendOutcome>> {
        let request = FcmRequest {
            registration_ids: tokens,
            notification,
            data,
        };

        let response = self
            .http
            .post(FCM_SEND_URL)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<FcmResponse>()
            .await?;

        let mut outcomes: Vec<SendOutcome> = response
            .results
            .iter()
            .map(|result| match result.error.as_deref() {
                None => SendOutcome::Delivered,
                Some("NotRegistered") | Some("InvalidRegistration") => SendOutcome::InvalidToken,
                Some(other) => SendOutcome::Failed(other.to_string()),
            })
            .collect();

        // A short result list must not make us treat missing entries as
        // invalid; pad as failed.
        while outcomes.len() < tokens.len() {
            outcomes.push(SendOutcome::Failed("missing result".to_string()));
        }
        Ok(outcomes)
    }
}

/// Recording mock for tests: captures every send and reports scripted
/// tokens as permanently invalid.
#[derive(Default)]
pub struct MockPush {
    sends: Mutex<Vec<RecordedSend>>,
    invalid_tokens: Mutex<HashSet<String>>,
}

/// One captured multicast send.
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

impl MockPush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a token to be reported as permanently invalid.
    pub fn mark_invalid(&self, token: &str) {
        self.invalid_tokens
            .lock()
            .expect("mock lock")
            .insert(token.to_string());
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl PushDelivery for MockPush {
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &PushNotification,
        data: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<SendOutcome>> {
        self.sends.lock().expect("mock lock").push(RecordedSend {
            tokens: tokens.to_vec(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            data: data.clone(),
        });

        let invalid = self.invalid_tokens.lock().expect("mock lock");
        Ok(tokens
            .iter()
            .map(|t| {
                if invalid.contains(t) {
                    SendOutcome::InvalidToken
                } else {
                    SendOutcome::Delivered
                }
            })
            .collect())
    }
}
