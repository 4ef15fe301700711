//! # In-Memory Store
//!
//! A [`StoreHandle`] that keeps documents in process. It enforces the same
//! per-batch write limit as the remote store and can be configured to reject
//! batches or individual documents, or to respond slowly. Used for dry runs
//! and throughout the test suite.

use super::{BatchHandle, DocumentRef, StoreHandle, WriteResult};
use crate::constants::{fields, MAX_BATCH_SIZE};
use crate::error::WriteFailure;
use crate::models::EnrichedRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type RejectFn = dyn Fn(&EnrichedRecord) -> bool + Send + Sync;

/// A document as persisted, with server timestamps resolved
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    pub fn title(&self) -> Option<&str> {
        self.fields.get(fields::TITLE).and_then(Value::as_str)
    }
}

#[derive(Clone, Default)]
struct Faults {
    max_batch_writes: Option<usize>,
    max_document_bytes: Option<usize>,
    fail_batches: bool,
    reject: Option<Arc<RejectFn>>,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, Vec<StoredDocument>>,
    batch_commits: usize,
    single_writes: usize,
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            faults: Arc::new(Faults {
                max_batch_writes: Some(MAX_BATCH_SIZE),
                ..Faults::default()
            }),
        }
    }

    fn faults_mut(&mut self) -> &mut Faults {
        Arc::make_mut(&mut self.faults)
    }

    /// Reject batches with more than `limit` staged writes
    pub fn with_max_batch_writes(mut self, limit: usize) -> Self {
        self.faults_mut().max_batch_writes = Some(limit);
        self
    }

    /// Reject any batch or document whose encoded fields exceed `limit` bytes
    pub fn with_max_document_bytes(mut self, limit: usize) -> Self {
        self.faults_mut().max_document_bytes = Some(limit);
        self
    }

    /// Make every batch commit fail while single writes still succeed
    pub fn with_failing_batches(mut self) -> Self {
        self.faults_mut().fail_batches = true;
        self
    }

    /// Reject any write, batched or single, whose payload matches `predicate`
    pub fn with_rejection<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EnrichedRecord) -> bool + Send + Sync + 'static,
    {
        self.faults_mut().reject = Some(Arc::new(predicate));
        self
    }

    /// Delay every commit by `latency` before it is applied
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.faults_mut().latency = Some(latency);
        self
    }

    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.state
            .lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Number of batches that committed successfully
    pub fn batch_commits(&self) -> usize {
        self.state.lock().batch_commits
    }

    /// Number of single-document writes that succeeded
    pub fn single_writes(&self) -> usize {
        self.state.lock().single_writes
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.faults.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_document(&self, doc: &DocumentRef, payload: &EnrichedRecord) -> WriteResult {
        if let Some(reject) = &self.faults.reject {
            if reject(payload) {
                return Err(WriteFailure::rejected(format!(
                    "document {doc} ('{}') failed validation",
                    payload.title()
                )));
            }
        }
        if let Some(limit) = self.faults.max_document_bytes {
            let size = payload.encoded_len();
            if size > limit {
                return Err(WriteFailure::rejected(format!(
                    "document {doc} is {size} bytes, exceeds the maximum of {limit} bytes"
                )));
            }
        }
        Ok(())
    }

    fn persist(state: &mut MemoryState, doc: &DocumentRef, payload: &EnrichedRecord, now: DateTime<Utc>) {
        let mut fields = payload.fields().clone();
        for (name, _) in payload.server_time_fields() {
            fields.remove(name);
        }

        state
            .collections
            .entry(doc.collection().to_string())
            .or_default()
            .push(StoredDocument {
                id: doc.id().to_string(),
                fields,
                created_at: now,
                updated_at: now,
            });
    }
}

#[async_trait]
impl StoreHandle for MemoryStore {
    fn batch(&self) -> Box<dyn BatchHandle> {
        Box::new(MemoryBatch {
            store: self.clone(),
            writes: Vec::new(),
        })
    }

    async fn set(&self, doc: &DocumentRef, payload: &EnrichedRecord) -> WriteResult {
        self.simulate_latency().await;
        self.check_document(doc, payload)?;

        let now = Utc::now();
        let mut state = self.state.lock();
        Self::persist(&mut state, doc, payload, now);
        state.single_writes += 1;
        Ok(())
    }
}

struct MemoryBatch {
    store: MemoryStore,
    writes: Vec<(DocumentRef, EnrichedRecord)>,
}

#[async_trait]
impl BatchHandle for MemoryBatch {
    fn set(&mut self, doc: DocumentRef, payload: EnrichedRecord) {
        self.writes.push((doc, payload));
    }

    fn len(&self) -> usize {
        self.writes.len()
    }

    async fn commit(self: Box<Self>) -> WriteResult {
        let store = &self.store;
        store.simulate_latency().await;

        if let Some(limit) = store.faults.max_batch_writes {
            if self.writes.len() > limit {
                return Err(WriteFailure::rejected(format!(
                    "maximum {limit} writes allowed per request, got {}",
                    self.writes.len()
                )));
            }
        }
        if store.faults.fail_batches {
            return Err(WriteFailure::rejected("batch commit refused by store"));
        }
        // Validate everything before applying anything
        for (doc, payload) in &self.writes {
            store.check_document(doc, payload)?;
        }

        let now = Utc::now();
        let mut state = store.state.lock();
        for (doc, payload) in &self.writes {
            MemoryStore::persist(&mut state, doc, payload, now);
        }
        state.batch_commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, ServerTimeMarker};
    use crate::store::CollectionRef;
    use serde_json::json;

    fn enriched(title: &str) -> EnrichedRecord {
        let record = Record::from_value(json!({"title": title, "createdAt": "client"})).unwrap();
        EnrichedRecord::new(record.fields().clone(), ServerTimeMarker)
    }

    #[tokio::test]
    async fn test_batch_commit_applies_all_writes_with_one_timestamp() {
        let store = MemoryStore::new();
        let collection = CollectionRef::new("articles");
        let mut batch = store.batch();
        for title in ["a", "b", "c"] {
            batch.set(collection.doc(), enriched(title));
        }
        assert_eq!(batch.len(), 3);
        batch.commit().await.unwrap();

        let docs = store.documents("articles");
        assert_eq!(docs.len(), 3);
        assert_eq!(store.batch_commits(), 1);
        assert!(docs.iter().all(|d| d.created_at == d.updated_at));
        assert!(docs.iter().all(|d| d.created_at == docs[0].created_at));
        // client-side timestamps never reach the store
        assert!(docs.iter().all(|d| !d.fields.contains_key("createdAt")));
    }

    #[tokio::test]
    async fn test_rejected_batch_applies_nothing() {
        let store = MemoryStore::new().with_rejection(|p| p.title() == "b");
        let collection = CollectionRef::new("articles");
        let mut batch = store.batch();
        for title in ["a", "b", "c"] {
            batch.set(collection.doc(), enriched(title));
        }
        let err = batch.commit().await.unwrap_err();
        assert!(matches!(err, WriteFailure::Rejected { .. }));
        assert_eq!(store.document_count("articles"), 0);
        assert_eq!(store.batch_commits(), 0);
    }

    #[tokio::test]
    async fn test_batch_write_limit() {
        let store = MemoryStore::new().with_max_batch_writes(2);
        let collection = CollectionRef::new("articles");
        let mut batch = store.batch();
        for title in ["a", "b", "c"] {
            batch.set(collection.doc(), enriched(title));
        }
        let err = batch.commit().await.unwrap_err();
        assert!(err.to_string().contains("maximum 2 writes"));
    }

    #[tokio::test]
    async fn test_failing_batches_still_accept_single_writes() {
        let store = MemoryStore::new().with_failing_batches();
        let collection = CollectionRef::new("articles");

        let mut batch = store.batch();
        batch.set(collection.doc(), enriched("a"));
        assert!(batch.commit().await.is_err());

        store.set(&collection.doc(), &enriched("a")).await.unwrap();
        assert_eq!(store.single_writes(), 1);
        assert_eq!(store.documents("articles")[0].title(), Some("a"));
    }

    #[tokio::test]
    async fn test_document_size_limit() {
        let store = MemoryStore::new().with_max_document_bytes(8);
        let err = store
            .set(&CollectionRef::new("articles").doc(), &enriched("much too long"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));
    }
}
