// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document store abstraction.
//!
//! The store is an explicit dependency injected into every component, so
//! business logic can run against the in-memory backend in tests and the
//! Firestore backend in production. Documents are schemaless JSON values
//! addressed by (collection, id); atomicity comes from conflict-checked
//! transactions over an explicit read/write set.

use async_trait::async_trait;
use serde_json::Value;

/// Errors surfaced by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A transaction observed a conflicting write at commit time.
    /// The caller is expected to retry the whole transaction body.
    #[error("transaction conflict")]
    Conflict,

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Scalar value usable in query filters.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Str(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Str(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl FilterValue {
    /// Compare against a JSON document field.
    pub fn matches_eq(&self, field: &Value) -> bool {
        match self {
            FilterValue::Str(s) => field.as_str() == Some(s.as_str()),
            FilterValue::Int(i) => field.as_i64() == Some(*i),
            FilterValue::Bool(b) => field.as_bool() == Some(*b),
        }
    }
}

/// A single query condition; conditions in a list are ANDed.
#[derive(Debug, Clone)]
pub enum Filter {
    Eq(String, FilterValue),
    /// Field >= value (string or integer ordering).
    Gte(String, FilterValue),
    /// Field < value (string or integer ordering).
    Lt(String, FilterValue),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<FilterValue>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn gte(field: &str, value: impl Into<FilterValue>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn lt(field: &str, value: impl Into<FilterValue>) -> Self {
        Filter::Lt(field.to_string(), value.into())
    }
}

/// Schemaless document store addressed by (collection, document id).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Create or overwrite a document.
    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError>;

    /// Delete a document (no-op if absent).
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Query a collection with ANDed filters and an optional result limit.
    /// Returns (document id, document) pairs.
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<u32>,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    /// Delete a batch of documents from one collection. Callers must keep
    /// batches within the store's 500-operation write bound.
    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<(), StoreError>;

    /// Begin a conflict-checked transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// A conflict-checked read-modify-write transaction.
///
/// Reads register documents for conflict detection; writes are staged and
/// applied atomically at commit. Commit fails with [`StoreError::Conflict`]
/// if any read document changed since it was read.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Read a document inside the transaction, registering it in the
    /// conflict-detection read set.
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Stage a create/overwrite.
    fn set(&mut self, collection: &str, id: &str, doc: Value);

    /// Stage a deletion.
    fn delete(&mut self, collection: &str, id: &str);

    /// Atomically apply all staged writes.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Abandon the transaction without writing.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
