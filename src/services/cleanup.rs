// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cascading cleanup sweeper.
//!
//! Trip deletion cascades across every dependent collection in bounded
//! batches; each collection fails independently so one broken collection
//! never aborts cleanup of the rest. A separate operator-invoked sweep
//! reconciles encryption-key records whose parent trip is gone.

use crate::db::store::Filter;
use crate::db::{collections, Db};
use crate::error::Result;

// The store caps write batches at 500 operations; stay under with headroom.
const DELETE_BATCH_SIZE: u32 = 400;

/// Collections swept when a trip is deleted.
const TRIP_SCOPED_COLLECTIONS: &[&str] = &[
    collections::ENCRYPTION_KEYS,
    collections::ITINERARY_ITEMS,
    collections::ITEM_COMMENTS,
    collections::CHAT_MESSAGES,
    collections::TRIP_ACTIVITIES,
    collections::TRIP_INVITES,
    collections::FORECASTS,
];

#[derive(Clone)]
pub struct CleanupService {
    db: Db,
}

impl CleanupService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Cascade deletion of everything scoped to a deleted trip.
    pub async fn on_trip_deleted(&self, trip_id: &str) {
        for collection in TRIP_SCOPED_COLLECTIONS {
            match self.purge_by_trip(collection, trip_id).await {
                Ok(count) if count > 0 => {
                    tracing::info!(trip_id, collection, count, "Purged trip-scoped documents");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(trip_id, collection, error = %err, "Trip cleanup failed for collection");
                }
            }
        }
    }

    /// Delete all documents in one collection carrying this trip id,
    /// continuing across batches until the collection is empty.
    async fn purge_by_trip(&self, collection: &str, trip_id: &str) -> Result<usize> {
        let filter = [Filter::eq("trip_id", trip_id)];
        let mut total = 0;

        loop {
            let hits = self
                .db
                .store()
                .query(collection, &filter, Some(DELETE_BATCH_SIZE))
                .await?;
            if hits.is_empty() {
                break;
            }

            let ids: Vec<String> = hits.into_iter().map(|(id, _)| id).collect();
            total += ids.len();
            self.db.store().delete_batch(collection, &ids).await?;
        }
        Ok(total)
    }

    /// Operator-invoked reconciliation: delete encryption-key records whose
    /// parent trip no longer exists. Compensates for deletions that raced a
    /// partial failure or predate the deletion trigger.
    pub async fn sweep_orphaned_keys(&self) -> Result<usize> {
        let records = self
            .db
            .store()
            .query(collections::ENCRYPTION_KEYS, &[], None)
            .await?;

        let mut trip_ids: Vec<String> = records
            .iter()
            .filter_map(|(_, doc)| doc.get("trip_id").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect();
        trip_ids.sort();
        trip_ids.dedup();

        let mut deleted = 0;
        for trip_id in trip_ids {
            match self.db.get_trip(&trip_id).await {
                Ok(Some(_)) => {}
                Ok(None) => match self
                    .purge_by_trip(collections::ENCRYPTION_KEYS, &trip_id)
                    .await
                {
                    Ok(count) => {
                        tracing::info!(trip_id, count, "Swept orphaned encryption keys");
                        deleted += count;
                    }
                    Err(err) => {
                        tracing::error!(trip_id, error = %err, "Orphaned key sweep failed for trip");
                    }
                },
                Err(err) => {
                    tracing::error!(trip_id, error = %err, "Trip existence check failed during sweep");
                }
            }
        }
        Ok(deleted)
    }
}
