// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed document-change event bus.
//!
//! Writes publish events here after they are durably committed; a worker
//! task delivers them to the notification dispatcher and cleanup sweeper,
//! decoupled from the originating request. Delivery is at-least-once and
//! unordered across distinct documents, so handlers are idempotent and
//! never propagate failures.

use crate::models::{ChatMessage, FriendRequest, InviteToken, ItemComment, Trip};
use crate::services::{CleanupService, NotificationDispatcher};
use tokio::sync::mpsc;

/// A document-change event.
#[derive(Debug, Clone)]
pub enum Event {
    MessageCreated {
        message: ChatMessage,
    },
    CommentCreated {
        comment: ItemComment,
    },
    FriendRequestCreated {
        request: FriendRequest,
    },
    InviteCreated {
        invite: InviteToken,
    },
    /// The trip document changed; membership diffs are detected from the
    /// before/after snapshots.
    TripWritten {
        trip_id: String,
        before: Option<Trip>,
        after: Option<Trip>,
    },
    TripDeleted {
        trip_id: String,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::MessageCreated { .. } => "message_created",
            Event::CommentCreated { .. } => "comment_created",
            Event::FriendRequestCreated { .. } => "friend_request_created",
            Event::InviteCreated { .. } => "invite_created",
            Event::TripWritten { .. } => "trip_written",
            Event::TripDeleted { .. } => "trip_deleted",
        }
    }
}

/// Publishing handle, cloned into every writer.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish an event. Dropped (with a log line) if the worker is gone;
    /// event loss is a quality-of-service issue, never a request failure.
    pub fn publish(&self, event: Event) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            tracing::warn!(kind, "Event worker not running, event dropped");
        }
    }
}

/// Routes events to their handlers.
pub struct EventRouter {
    dispatcher: NotificationDispatcher,
    cleanup: CleanupService,
}

impl EventRouter {
    pub fn new(dispatcher: NotificationDispatcher, cleanup: CleanupService) -> Self {
        Self {
            dispatcher,
            cleanup,
        }
    }

    /// Handle one event. Handler failures are logged inside the handlers;
    /// nothing escapes to the caller.
    pub async fn handle(&self, event: Event) {
        tracing::debug!(kind = event.kind(), "Handling event");
        match event {
            Event::MessageCreated { message } => {
                self.dispatcher.on_message_created(&message).await;
            }
            Event::CommentCreated { comment } => {
                self.dispatcher.on_comment_created(&comment).await;
            }
            Event::FriendRequestCreated { request } => {
                self.dispatcher.on_friend_request_created(&request).await;
            }
            Event::InviteCreated { invite } => {
                self.dispatcher.on_invite_created(&invite).await;
            }
            Event::TripWritten {
                trip_id,
                before,
                after,
            } => {
                self.dispatcher
                    .on_trip_written(&trip_id, before.as_ref(), after.as_ref())
                    .await;
            }
            Event::TripDeleted { trip_id } => {
                self.cleanup.on_trip_deleted(&trip_id).await;
            }
        }
    }
}

/// Worker loop: drain the bus until every publisher is dropped.
pub async fn run_worker(mut rx: mpsc::UnboundedReceiver<Event>, router: EventRouter) {
    while let Some(event) = rx.recv().await {
        router.handle(event).await;
    }
    tracing::info!("Event worker stopped");
}
