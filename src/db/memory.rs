// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store backend.
//!
//! Backs tests and offline mode. Implements the same optimistic
//! transaction contract as the Firestore backend: every document carries a
//! version, transactional reads record the version they observed, and
//! commit fails with [`StoreError::Conflict`] if any observed document has
//! since changed.

use crate::db::store::{DocumentStore, Filter, FilterValue, StoreError, StoreTransaction};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
struct Versioned {
    version: u64,
    doc: Value,
}

struct Inner {
    docs: DashMap<(String, String), Versioned>,
    /// Serializes commits so version checks and writes are atomic.
    commit_lock: Mutex<()>,
    next_version: AtomicU64,
}

/// In-memory document store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                docs: DashMap::new(),
                commit_lock: Mutex::new(()),
                next_version: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key(collection: &str, id: &str) -> (String, String) {
    (collection.to_string(), id.to_string())
}

fn matches(doc: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(field, value) => doc
            .get(field)
            .map(|f| value.matches_eq(f))
            .unwrap_or(false),
        Filter::Gte(field, value) => compare(doc.get(field), value)
            .map(|ord| ord != std::cmp::Ordering::Less)
            .unwrap_or(false),
        Filter::Lt(field, value) => compare(doc.get(field), value)
            .map(|ord| ord == std::cmp::Ordering::Less)
            .unwrap_or(false),
    })
}

fn compare(field: Option<&Value>, value: &FilterValue) -> Option<std::cmp::Ordering> {
    match (field?, value) {
        (Value::String(s), FilterValue::Str(v)) => Some(s.as_str().cmp(v.as_str())),
        (Value::Number(n), FilterValue::Int(v)) => Some(n.as_i64()?.cmp(v)),
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .inner
            .docs
            .get(&key(collection, id))
            .map(|entry| entry.doc.clone()))
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        let version = self.inner.next_version.fetch_add(1, Ordering::SeqCst);
        self.inner
            .docs
            .insert(key(collection, id), Versioned { version, doc });
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.docs.remove(&key(collection, id));
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<u32>,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let mut results: Vec<(String, Value)> = self
            .inner
            .docs
            .iter()
            .filter(|entry| entry.key().0 == collection && matches(&entry.doc, filters))
            .map(|entry| (entry.key().1.clone(), entry.doc.clone()))
            .collect();

        // Deterministic order for tests; Firestore would need an order_by.
        results.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(limit) = limit {
            results.truncate(limit as usize);
        }
        Ok(results)
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<(), StoreError> {
        for id in ids {
            self.inner.docs.remove(&key(collection, id));
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }
}

enum StagedWrite {
    Set(String, String, Value),
    Delete(String, String),
}

struct MemoryTransaction {
    inner: Arc<Inner>,
    /// Observed version per read document; 0 means "absent at read time".
    reads: HashMap<(String, String), u64>,
    writes: Vec<StagedWrite>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let k = key(collection, id);
        let entry = self.inner.docs.get(&k);
        let (version, doc) = match entry {
            Some(v) => (v.version, Some(v.doc.clone())),
            None => (0, None),
        };
        self.reads.insert(k, version);
        Ok(doc)
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
        let _guard = self.inner.commit_lock.lock().await;

        for (k, observed) in &self.reads {
            let current = self.inner.docs.get(k).map(|v| v.version).unwrap_or(0);
            if current != *observed {
                return Err(StoreError::Conflict);
            }
        }

        for write in self.writes {
            match write {
                StagedWrite::Set(collection, id, doc) => {
                    let version = self.inner.next_version.fetch_add(1, Ordering::SeqCst);
                    self.inner
                        .docs
                        .insert((collection, id), Versioned { version, doc });
                }
                StagedWrite::Delete(collection, id) => {
                    self.inner.docs.remove(&(collection, id));
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
