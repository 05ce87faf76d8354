// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore backend for the document store abstraction.
//!
//! Documents cross this boundary as `serde_json::Value`; typed conversion
//! happens in the [`crate::db::Db`] wrapper. Transactional reads run under
//! the native Firestore transaction, so they join its read set; a commit
//! that races a concurrent write aborts and surfaces as
//! [`StoreError::Conflict`], and the caller retries from fresh reads.

use crate::db::store::{DocumentStore, Filter, FilterValue, StoreError, StoreTransaction};
use async_trait::async_trait;
use serde_json::Value;

/// Firestore-backed document store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

fn doc_id_from_name(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn apply_filters(
    q: &firestore::select_filter_builder::FirestoreQueryFilterBuilder,
    filters: &[Filter],
) -> Vec<Option<firestore::FirestoreQueryFilter>> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(field, value) => match value {
                FilterValue::Str(v) => q.field(field.clone()).eq(v.clone()),
                FilterValue::Int(v) => q.field(field.clone()).eq(*v),
                FilterValue::Bool(v) => q.field(field.clone()).eq(*v),
            },
            Filter::Gte(field, value) => match value {
                FilterValue::Str(v) => q.field(field.clone()).greater_than_or_equal(v.clone()),
                FilterValue::Int(v) => q.field(field.clone()).greater_than_or_equal(*v),
                FilterValue::Bool(v) => q.field(field.clone()).greater_than_or_equal(*v),
            },
            Filter::Lt(field, value) => match value {
                FilterValue::Str(v) => q.field(field.clone()).less_than(v.clone()),
                FilterValue::Int(v) => q.field(field.clone()).less_than(*v),
                FilterValue::Bool(v) => q.field(field.clone()).less_than(*v),
            },
        })
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<u32>,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let filters = filters.to_vec();
        let query = self
            .client
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.for_all(apply_filters(&q, &filters)));

        let query = if let Some(limit) = limit {
            query.limit(limit)
        } else {
            query
        };

        let docs = query
            .query()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        docs.iter()
            .map(|doc| {
                let value: Value = firestore::FirestoreDb::deserialize_doc_to(doc)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                Ok((doc_id_from_name(&doc.name), value))
            })
            .collect()
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<(), StoreError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        for id in ids {
            self.client
                .fluent()
                .delete()
                .from(collection)
                .document_id(id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    StoreError::Backend(format!(
                        "Failed to add deletion to transaction for {}: {}",
                        collection, e
                    ))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to commit batch deletion: {}", e)))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let native = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        // The native transaction borrows the client, so hold its owned data
        // instead and rebuild it at commit/rollback time. Reads go through a
        // client clone pinned to the transaction so they join its read set.
        let data = native.into_data();
        let tx_client = self.client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(data.transaction_id().clone()),
        );

        Ok(Box::new(FirestoreTransaction {
            client: self.client.clone(),
            tx_client,
            data,
            writes: Vec::new(),
        }))
    }
}

enum StagedWrite {
    Set(String, String, Value),
    Delete(String, String),
}

/// Conflict-checked transaction over the Firestore client.
///
/// Reads run under the native Firestore transaction; writes accumulate
/// locally and commit in one shot. A concurrent write to anything read here
/// aborts the commit.
struct FirestoreTransaction {
    client: firestore::FirestoreDb,
    tx_client: firestore::FirestoreDb,
    data: firestore::FirestoreTransactionData,
    writes: Vec<StagedWrite>,
}

#[async_trait]
impl StoreTransaction for FirestoreTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.tx_client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn set(&mut self, collection: &str, id: &str, doc: Value) {
        self.writes
            .push(StagedWrite::Set(collection.to_string(), id.to_string(), doc));
    }

    fn delete(&mut self, collection: &str, id: &str) {
        self.writes
            .push(StagedWrite::Delete(collection.to_string(), id.to_string()));
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut transaction = firestore::FirestoreTransaction::from_data(&this.client, this.data);

        for write in &this.writes {
            match write {
                StagedWrite::Set(collection, id, doc) => {
                    this.client
                        .fluent()
                        .update()
                        .in_col(collection)
                        .document_id(id)
                        .object(doc)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            StoreError::Backend(format!("Failed to stage write: {}", e))
                        })?;
                }
                StagedWrite::Delete(collection, id) => {
                    this.client
                        .fluent()
                        .delete()
                        .from(collection)
                        .document_id(id)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            StoreError::Backend(format!("Failed to stage delete: {}", e))
                        })?;
                }
            }
        }

        transaction.commit().await.map_err(|e| {
            let msg = e.to_string();
            if msg.to_ascii_lowercase().contains("aborted") {
                StoreError::Conflict
            } else {
                StoreError::Backend(format!("Transaction commit failed: {}", msg))
            }
        })?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        firestore::FirestoreTransaction::from_data(&this.client, this.data)
            .rollback()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to roll back transaction: {}", e)))?;
        Ok(())
    }
}
