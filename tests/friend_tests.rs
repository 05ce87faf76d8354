// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friend request state machine tests.

use tripweaver::db::collections;
use tripweaver::error::AppError;
use tripweaver::models::{FriendEdge, FriendRequest, FriendRequestStatus};
use tripweaver::services::{FriendRequestAction, FriendService};

mod common;
use common::{seed_profile, test_bus, test_db};

async fn pending_request_id(db: &tripweaver::db::Db, from: &str, to: &str) -> String {
    db.pending_request_between(from, to)
        .await
        .unwrap()
        .expect("pending request should exist")
        .id
}

#[tokio::test]
async fn send_request_creates_single_pending() {
    let db = test_db();
    let (bus, _rx) = test_bus();
    seed_profile(&db, "alice", "alice@example.com", "Alice").await;
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;

    let service = FriendService::new(db.clone(), bus);
    let outcome = service
        .send_friend_request("alice", " Bob@Example.COM ")
        .await
        .unwrap();
    assert!(!outcome.already);

    // A second send while one is pending is an idempotent no-op.
    let outcome = service
        .send_friend_request("alice", "bob@example.com")
        .await
        .unwrap();
    assert!(outcome.already);

    let pending = db
        .store()
        .query(
            collections::FRIEND_REQUESTS,
            &[
                tripweaver::db::store::Filter::eq("from_uid", "alice"),
                tripweaver::db::store::Filter::eq("status", "pending"),
            ],
            None,
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn send_request_rejects_unknown_and_self() {
    let db = test_db();
    let (bus, _rx) = test_bus();
    seed_profile(&db, "alice", "alice@example.com", "Alice").await;

    let service = FriendService::new(db.clone(), bus);

    let err = service
        .send_friend_request("alice", "ghost@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = service
        .send_friend_request("alice", "alice@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FailedPrecondition(_)));

    let err = service
        .send_friend_request("alice", "not-an-email")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn accept_creates_both_edges_atomically() {
    let db = test_db();
    let (bus, _rx) = test_bus();
    seed_profile(&db, "alice", "alice@example.com", "Alice").await;
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;

    let service = FriendService::new(db.clone(), bus);
    service
        .send_friend_request("alice", "bob@example.com")
        .await
        .unwrap();
    let request_id = pending_request_id(&db, "alice", "bob").await;

    let status = service
        .respond_to_friend_request("bob", &request_id, FriendRequestAction::Accept)
        .await
        .unwrap();
    assert_eq!(status, FriendRequestStatus::Accepted);

    for (owner, friend) in [("alice", "bob"), ("bob", "alice")] {
        let edge = db
            .store()
            .get(collections::FRIENDS, &FriendEdge::doc_id(owner, friend))
            .await
            .unwrap();
        assert!(edge.is_some(), "edge {}->{} should exist", owner, friend);
    }

    let request: FriendRequest = serde_json::from_value(
        db.store()
            .get(collections::FRIEND_REQUESTS, &request_id)
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(request.status, FriendRequestStatus::Accepted);
    assert!(request.decided_at.is_some());
}

#[tokio::test]
async fn responses_to_terminal_requests_are_idempotent() {
    let db = test_db();
    let (bus, _rx) = test_bus();
    seed_profile(&db, "alice", "alice@example.com", "Alice").await;
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;

    let service = FriendService::new(db.clone(), bus);
    service
        .send_friend_request("alice", "bob@example.com")
        .await
        .unwrap();
    let request_id = pending_request_id(&db, "alice", "bob").await;

    service
        .respond_to_friend_request("bob", &request_id, FriendRequestAction::Reject)
        .await
        .unwrap();

    // A later accept returns the stored terminal status without flipping it.
    let status = service
        .respond_to_friend_request("bob", &request_id, FriendRequestAction::Accept)
        .await
        .unwrap();
    assert_eq!(status, FriendRequestStatus::Rejected);

    // No edges were created for the rejected request.
    let edge = db
        .store()
        .get(collections::FRIENDS, &FriendEdge::doc_id("alice", "bob"))
        .await
        .unwrap();
    assert!(edge.is_none());
}

#[tokio::test]
async fn only_the_addressee_may_respond() {
    let db = test_db();
    let (bus, _rx) = test_bus();
    seed_profile(&db, "alice", "alice@example.com", "Alice").await;
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;

    let service = FriendService::new(db.clone(), bus);
    service
        .send_friend_request("alice", "bob@example.com")
        .await
        .unwrap();
    let request_id = pending_request_id(&db, "alice", "bob").await;

    let err = service
        .respond_to_friend_request("mallory", &request_id, FriendRequestAction::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));

    let err = service
        .respond_to_friend_request("bob", "missing", FriendRequestAction::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn action_parsing() {
    assert!(FriendRequestAction::parse("accept").is_ok());
    assert!(FriendRequestAction::parse("reject").is_ok());
    assert!(matches!(
        FriendRequestAction::parse("block"),
        Err(AppError::InvalidArgument(_))
    ));
}
