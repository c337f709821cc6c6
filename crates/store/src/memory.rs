//! `MemoryStore` - in-memory `DocumentStore` backend.
//!
//! Backs tests and the CLI. Besides the trait operations it offers an
//! optional unique index, per-row scan latency, one-shot fault injection
//! and call counters, so the query layer can be exercised against slow or
//! failing storage.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::StoreError;
use crate::filter::Filter;
use crate::sort::{SortSpec, ID_FIELD};
use crate::traits::{Document, DocumentStore, InsertOutcome, ScanCursor};

/// Store operations that can be made to fail once via [`MemoryStore::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Count,
    Find,
    /// The next opened scan yields one row, then errors.
    Scan,
    /// The next scan close reports an error (the scan is still released).
    Close,
    Insert,
    Delete,
}

/// Call counters observed by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub counts: u64,
    pub finds: u64,
    pub inserts: u64,
    pub deletes: u64,
    /// Scans opened and not yet released.
    pub open_scans: u64,
}

#[derive(Debug, Default)]
struct Counters {
    counts: AtomicU64,
    finds: AtomicU64,
    inserts: AtomicU64,
    deletes: AtomicU64,
    open_scans: AtomicU64,
}

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Document>,
    next_id: u64,
}

/// In-memory document collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collection: RwLock<Collection>,
    unique_fields: Vec<String>,
    scan_latency: Duration,
    faults: Mutex<HashSet<StoreOp>>,
    counters: Arc<Counters>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat documents agreeing on all of `fields` as the same identity.
    pub fn with_unique_index(mut self, fields: &[&str]) -> Self {
        self.unique_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Delay every row produced by a scan.
    pub fn with_scan_latency(mut self, latency: Duration) -> Self {
        self.scan_latency = latency;
        self
    }

    /// Make the next call of `op` fail.
    pub fn fail_next(&self, op: StoreOp) {
        self.faults.lock().insert(op);
    }

    pub fn stats(&self) -> StoreStats {
        let c = &self.counters;
        StoreStats {
            counts: c.counts.load(Ordering::SeqCst),
            finds: c.finds.load(Ordering::SeqCst),
            inserts: c.inserts.load(Ordering::SeqCst),
            deletes: c.deletes.load(Ordering::SeqCst),
            open_scans: c.open_scans.load(Ordering::SeqCst),
        }
    }

    /// Number of stored documents, regardless of filter.
    pub fn len(&self) -> usize {
        self.collection.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_fault(&self, op: StoreOp) -> bool {
        self.faults.lock().remove(&op)
    }

    fn same_identity(&self, a: &Value, b: &Value) -> bool {
        !self.unique_fields.is_empty()
            && self
                .unique_fields
                .iter()
                .all(|f| a.get(f).is_some() && a.get(f) == b.get(f))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[tracing::instrument(skip(self), fields(predicates = filter.predicates().len()))]
    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.counters.counts.fetch_add(1, Ordering::SeqCst);
        if self.take_fault(StoreOp::Count) {
            return Err(StoreError::Unavailable("injected count failure".into()));
        }
        let collection = self.collection.read();
        Ok(collection.docs.iter().filter(|d| filter.matches(d)).count() as u64)
    }

    #[tracing::instrument(skip(self, sort), fields(sort = %sort.fingerprint()))]
    async fn find(
        &self,
        filter: &Filter,
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Box<dyn ScanCursor>, StoreError> {
        self.counters.finds.fetch_add(1, Ordering::SeqCst);
        if self.take_fault(StoreOp::Find) {
            return Err(StoreError::Unavailable("injected find failure".into()));
        }

        let mut rows: Vec<Document> = {
            let collection = self.collection.read();
            collection
                .docs
                .iter()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect()
        };
        rows.sort_by(|a, b| sort.compare(a, b));

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = match limit {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };
        let rows: VecDeque<Document> = rows.into_iter().skip(skip).take(take).collect();

        self.counters.open_scans.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryScan {
            rows,
            produced: 0,
            fail_after: self.take_fault(StoreOp::Scan).then_some(1),
            fail_close: self.take_fault(StoreOp::Close),
            latency: self.scan_latency,
            counters: Arc::clone(&self.counters),
        }))
    }

    #[tracing::instrument(skip(self, doc))]
    async fn insert(&self, mut doc: Document) -> Result<InsertOutcome, StoreError> {
        self.counters.inserts.fetch_add(1, Ordering::SeqCst);
        if self.take_fault(StoreOp::Insert) {
            return Err(StoreError::Unavailable("injected insert failure".into()));
        }
        let Some(obj) = doc.as_object_mut() else {
            return Err(StoreError::InvalidDocument("document is not an object".into()));
        };

        let mut collection = self.collection.write();
        let given_id = match obj.get(ID_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(StoreError::InvalidDocument(format!(
                    "{ID_FIELD} must be a string, got {other}"
                )))
            }
        };

        if let Some(id) = &given_id {
            let taken = collection
                .docs
                .iter()
                .any(|d| d.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str()));
            if taken {
                tracing::debug!(id = %id, "duplicate id ignored");
                return Ok(InsertOutcome::DuplicateIgnored);
            }
        }
        if collection.docs.iter().any(|d| self.same_identity(d, &doc)) {
            tracing::debug!("duplicate identity ignored");
            return Ok(InsertOutcome::DuplicateIgnored);
        }

        let id = match given_id {
            Some(id) => id,
            None => {
                collection.next_id += 1;
                let id = format!("{:024x}", collection.next_id);
                if let Some(obj) = doc.as_object_mut() {
                    obj.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                }
                id
            }
        };
        collection.docs.push(doc);
        Ok(InsertOutcome::Inserted { id })
    }

    #[tracing::instrument(skip(self), fields(predicates = filter.predicates().len()))]
    async fn delete(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.counters.deletes.fetch_add(1, Ordering::SeqCst);
        if self.take_fault(StoreOp::Delete) {
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        let mut collection = self.collection.write();
        let before = collection.docs.len();
        collection.docs.retain(|d| !filter.matches(d));
        Ok((before - collection.docs.len()) as u64)
    }
}

/// A materialized scan. Released on drop.
struct MemoryScan {
    rows: VecDeque<Document>,
    produced: usize,
    fail_after: Option<usize>,
    fail_close: bool,
    latency: Duration,
    counters: Arc<Counters>,
}

#[async_trait]
impl ScanCursor for MemoryScan {
    async fn next(&mut self) -> Result<Option<Document>, StoreError> {
        if self.fail_after == Some(self.produced) {
            return Err(StoreError::Scan("injected scan failure".into()));
        }
        if self.rows.is_empty() {
            return Ok(None);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.produced += 1;
        Ok(self.rows.pop_front())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        if self.fail_close {
            return Err(StoreError::Backend("injected close failure".into()));
        }
        Ok(())
    }
}

impl Drop for MemoryScan {
    fn drop(&mut self) {
        self.counters.open_scans.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn dropped_scan_is_released() {
        let store = MemoryStore::new();
        store.insert(json!({"n": 1})).await.unwrap();
        let scan = store
            .find(&Filter::new(), &SortSpec::insertion_order(), 0, 0)
            .await
            .unwrap();
        assert_eq!(store.stats().open_scans, 1);
        drop(scan);
        assert_eq!(store.stats().open_scans, 0);
    }

    #[tokio::test]
    async fn injected_scan_fault_fails_mid_scan() {
        let store = MemoryStore::new();
        for n in 0..3 {
            store.insert(json!({"n": n})).await.unwrap();
        }
        store.fail_next(StoreOp::Scan);
        let mut scan = store
            .find(&Filter::new(), &SortSpec::insertion_order(), 0, 0)
            .await
            .unwrap();
        assert!(scan.next().await.unwrap().is_some());
        assert!(matches!(scan.next().await, Err(StoreError::Scan(_))));
        scan.close().await.unwrap();
        assert_eq!(store.stats().open_scans, 0);
    }

    #[tokio::test]
    async fn non_string_id_is_rejected() {
        let store = MemoryStore::new();
        let err = store.insert(json!({"_id": 7})).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
        assert!(store.is_empty());
    }
}
