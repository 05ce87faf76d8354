// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification dispatcher tests over the recording push mock.

use std::sync::Arc;
use tripweaver::db::{collections, Db};
use tripweaver::models::{
    ChatMessage, FriendRequest, FriendRequestStatus, NotificationToken, UserProfile,
};
use tripweaver::services::{MockPush, NotificationDispatcher};

mod common;
use common::{seed_profile, seed_trip, test_db};

fn dispatcher(db: &Db) -> (NotificationDispatcher, Arc<MockPush>) {
    let push = Arc::new(MockPush::new());
    (NotificationDispatcher::new(db.clone(), push.clone()), push)
}

async fn seed_token(db: &Db, uid: &str, token: &str) {
    db.add_notification_token(&NotificationToken {
        uid: uid.to_string(),
        token: token.to_string(),
        platform: "android".to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    })
    .await
    .unwrap();
}

fn message(trip_id: &str, sender: &str, mentions: &[&str]) -> ChatMessage {
    ChatMessage {
        trip_id: trip_id.to_string(),
        sender_uid: sender.to_string(),
        text: "where should we stay?".to_string(),
        mentions: mentions.iter().map(|s| s.to_string()).collect(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[tokio::test]
async fn chat_message_notifies_other_members_with_mention_type() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    seed_profile(&db, "alice", "alice@example.com", "Alice").await;
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;
    seed_profile(&db, "carol", "carol@example.com", "Carol").await;
    let mut trip = seed_trip(&db, "t1", "Alps", "alice").await;
    trip.members.insert("bob".to_string(), true);
    trip.roles
        .insert("bob".to_string(), tripweaver::models::TripRole::Viewer);
    trip.members.insert("carol".to_string(), true);
    trip.roles
        .insert("carol".to_string(), tripweaver::models::TripRole::Viewer);
    db.set_trip("t1", &trip).await.unwrap();

    seed_token(&db, "bob", "tok-bob").await;
    seed_token(&db, "carol", "tok-carol").await;
    seed_token(&db, "alice", "tok-alice").await;

    dispatcher
        .on_message_created(&message("t1", "alice", &["carol"]))
        .await;

    let sends = push.sends();
    // Sender is never notified.
    assert_eq!(sends.len(), 2);
    for send in &sends {
        assert!(!send.tokens.contains(&"tok-alice".to_string()));
        if send.tokens.contains(&"tok-carol".to_string()) {
            assert_eq!(send.data["type"], "mention");
        } else {
            assert_eq!(send.data["type"], "chat_message");
        }
    }
}

#[tokio::test]
async fn disabled_preference_suppresses_delivery() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    seed_profile(&db, "alice", "alice@example.com", "Alice").await;
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;
    let mut trip = seed_trip(&db, "t1", "Alps", "alice").await;
    trip.members.insert("bob".to_string(), true);
    trip.roles
        .insert("bob".to_string(), tripweaver::models::TripRole::Viewer);
    db.set_trip("t1", &trip).await.unwrap();
    seed_token(&db, "bob", "tok-bob").await;

    // Bob turns chat messages off.
    let mut bob: UserProfile = db.get_profile("bob").await.unwrap().unwrap();
    bob.notification_prefs.chat_message = false;
    db.upsert_profile(&bob).await.unwrap();

    dispatcher.on_message_created(&message("t1", "alice", &[])).await;
    assert!(push.sends().is_empty());

    // Mentions are a separate category and still get through.
    dispatcher
        .on_message_created(&message("t1", "alice", &["bob"]))
        .await;
    assert_eq!(push.sends().len(), 1);
}

#[tokio::test]
async fn missing_profile_defaults_every_preference_on() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    // "ghost" has delivery endpoints but no profile document.
    seed_token(&db, "ghost", "tok-ghost").await;

    let request = FriendRequest {
        id: "r1".to_string(),
        from_uid: "alice".to_string(),
        to_uid: "ghost".to_string(),
        status: FriendRequestStatus::Pending,
        created_at: chrono::Utc::now().to_rfc3339(),
        decided_at: None,
    };
    dispatcher.on_friend_request_created(&request).await;

    let sends = push.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].data["type"], "friend_request");
    assert_eq!(sends[0].data["from_uid"], "alice");
}

#[tokio::test]
async fn no_endpoints_means_no_send() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;

    let request = FriendRequest {
        id: "r1".to_string(),
        from_uid: "alice".to_string(),
        to_uid: "bob".to_string(),
        status: FriendRequestStatus::Pending,
        created_at: chrono::Utc::now().to_rfc3339(),
        decided_at: None,
    };
    dispatcher.on_friend_request_created(&request).await;
    assert!(push.sends().is_empty());
}

#[tokio::test]
async fn permanently_invalid_endpoints_are_pruned() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;
    seed_token(&db, "bob", "tok-good").await;
    seed_token(&db, "bob", "tok-dead").await;
    push.mark_invalid("tok-dead");

    let request = FriendRequest {
        id: "r1".to_string(),
        from_uid: "alice".to_string(),
        to_uid: "bob".to_string(),
        status: FriendRequestStatus::Pending,
        created_at: chrono::Utc::now().to_rfc3339(),
        decided_at: None,
    };
    dispatcher.on_friend_request_created(&request).await;

    let remaining = db.tokens_for_user("bob").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].1.token, "tok-good");
}

#[tokio::test]
async fn invite_created_resolves_email_to_a_profile() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;
    seed_token(&db, "bob", "tok-bob").await;

    let invite = tripweaver::models::InviteToken {
        id: "i1".to_string(),
        trip_id: "t1".to_string(),
        email: "bob@example.com".to_string(),
        token: "tok".to_string(),
        role: tripweaver::models::TripRole::Viewer,
        status: tripweaver::models::InviteStatus::Pending,
        invited_by: "alice".to_string(),
        accepted_by: None,
        created_at: chrono::Utc::now().to_rfc3339(),
        expires_at: (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
    };
    dispatcher.on_invite_created(&invite).await;

    let sends = push.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].data["type"], "trip_invite");

    // An email with no profile yet is silently skipped.
    let mut unresolved = invite.clone();
    unresolved.email = "nobody@example.com".to_string();
    dispatcher.on_invite_created(&unresolved).await;
    assert_eq!(push.sends().len(), 1);
}

#[tokio::test]
async fn membership_diff_notifies_new_members_and_skips_self() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    seed_profile(&db, "alice", "alice@example.com", "Alice").await;
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;
    seed_token(&db, "bob", "tok-bob").await;
    seed_token(&db, "alice", "tok-alice").await;

    let before = seed_trip(&db, "t1", "Alps", "alice").await;
    let mut after = before.clone();
    after.members.insert("bob".to_string(), true);
    after
        .roles
        .insert("bob".to_string(), tripweaver::models::TripRole::Viewer);

    dispatcher
        .on_trip_written("t1", Some(&before), Some(&after))
        .await;

    let sends = push.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].tokens, vec!["tok-bob".to_string()]);
    assert_eq!(sends[0].data["type"], "trip_invite");
    // Inviter attribution: first pre-change member.
    assert_eq!(sends[0].data["inviter_uid"], "alice");
}

#[tokio::test]
async fn trip_deletion_event_is_not_a_membership_change() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    let before = seed_trip(&db, "t1", "Alps", "alice").await;

    dispatcher.on_trip_written("t1", Some(&before), None).await;
    assert!(push.sends().is_empty());
}

#[tokio::test]
async fn dispatcher_never_fails_on_store_trouble() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);

    // Trip is missing entirely; the handler logs and returns.
    dispatcher
        .on_message_created(&message("missing-trip", "alice", &[]))
        .await;
    assert!(push.sends().is_empty());
}

#[tokio::test]
async fn delivery_endpoints_are_scoped_per_user() {
    let db = test_db();
    let (dispatcher, push) = dispatcher(&db);
    seed_profile(&db, "bob", "bob@example.com", "Bob").await;
    seed_token(&db, "bob", "tok-bob").await;
    seed_token(&db, "carol", "tok-carol").await;

    let request = FriendRequest {
        id: "r1".to_string(),
        from_uid: "alice".to_string(),
        to_uid: "bob".to_string(),
        status: FriendRequestStatus::Pending,
        created_at: chrono::Utc::now().to_rfc3339(),
        decided_at: None,
    };
    dispatcher.on_friend_request_created(&request).await;

    let sends = push.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].tokens, vec!["tok-bob".to_string()]);

    // Carol's endpoint is untouched in the store.
    assert_eq!(
        db.store()
            .query(
                collections::NOTIFICATION_TOKENS,
                &[tripweaver::db::store::Filter::eq("uid", "carol")],
                None
            )
            .await
            .unwrap()
            .len(),
        1
    );
}
