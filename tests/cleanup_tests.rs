// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cascading-cleanup and orphan-sweep tests.

use serde_json::json;
use tripweaver::db::{collections, Db};
use tripweaver::services::CleanupService;

mod common;
use common::{seed_trip, test_db};

async fn seed_trip_docs(db: &Db, trip_id: &str, per_collection: usize) {
    let collections = [
        collections::ENCRYPTION_KEYS,
        collections::ITINERARY_ITEMS,
        collections::ITEM_COMMENTS,
        collections::CHAT_MESSAGES,
        collections::TRIP_ACTIVITIES,
        collections::TRIP_INVITES,
        collections::FORECASTS,
    ];
    for collection in collections {
        for n in 0..per_collection {
            db.store()
                .set(
                    collection,
                    &format!("{}-{}-{}", trip_id, collection, n),
                    json!({ "trip_id": trip_id, "n": n }),
                )
                .await
                .unwrap();
        }
    }
}

async fn count(db: &Db, collection: &str, trip_id: &str) -> usize {
    db.store()
        .query(
            collection,
            &[tripweaver::db::store::Filter::eq("trip_id", trip_id)],
            None,
        )
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn trip_deletion_cascades_across_every_scoped_collection() {
    let db = test_db();
    let cleanup = CleanupService::new(db.clone());
    seed_trip_docs(&db, "t1", 3).await;
    seed_trip_docs(&db, "t2", 2).await;

    cleanup.on_trip_deleted("t1").await;

    for collection in [
        collections::ENCRYPTION_KEYS,
        collections::ITINERARY_ITEMS,
        collections::ITEM_COMMENTS,
        collections::CHAT_MESSAGES,
        collections::TRIP_ACTIVITIES,
        collections::TRIP_INVITES,
        collections::FORECASTS,
    ] {
        assert_eq!(count(&db, collection, "t1").await, 0, "{}", collection);
        // A sibling trip's documents are never touched.
        assert_eq!(count(&db, collection, "t2").await, 2, "{}", collection);
    }
}

#[tokio::test]
async fn cascade_continues_past_one_delete_batch() {
    let db = test_db();
    let cleanup = CleanupService::new(db.clone());
    // More documents than one 400-document batch.
    for n in 0..450 {
        db.store()
            .set(
                collections::CHAT_MESSAGES,
                &format!("m{:04}", n),
                json!({ "trip_id": "t1", "n": n }),
            )
            .await
            .unwrap();
    }

    cleanup.on_trip_deleted("t1").await;
    assert_eq!(count(&db, collections::CHAT_MESSAGES, "t1").await, 0);
}

#[tokio::test]
async fn orphan_sweep_removes_only_keys_without_a_trip() {
    let db = test_db();
    let cleanup = CleanupService::new(db.clone());
    seed_trip(&db, "live", "Alps", "alice").await;

    for (trip_id, uid) in [("live", "alice"), ("live", "bob"), ("gone", "alice"), ("gone", "carol")]
    {
        db.store()
            .set(
                collections::ENCRYPTION_KEYS,
                &format!("{}_{}", trip_id, uid),
                json!({ "trip_id": trip_id, "member_uid": uid, "pending": true }),
            )
            .await
            .unwrap();
    }

    let deleted = cleanup.sweep_orphaned_keys().await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(count(&db, collections::ENCRYPTION_KEYS, "gone").await, 0);
    assert_eq!(count(&db, collections::ENCRYPTION_KEYS, "live").await, 2);
}

#[tokio::test]
async fn orphan_sweep_with_nothing_to_do_reports_zero() {
    let db = test_db();
    let cleanup = CleanupService::new(db.clone());
    assert_eq!(cleanup.sweep_orphaned_keys().await.unwrap(), 0);
}

#[tokio::test]
async fn trip_deleted_event_routes_to_the_cascade() {
    let db = test_db();
    let (router, _push) = common::test_event_router(&db);
    seed_trip_docs(&db, "t1", 2).await;

    router
        .handle(tripweaver::events::Event::TripDeleted {
            trip_id: "t1".to_string(),
        })
        .await;

    assert_eq!(count(&db, collections::CHAT_MESSAGES, "t1").await, 0);
    assert_eq!(count(&db, collections::ENCRYPTION_KEYS, "t1").await, 0);
}
