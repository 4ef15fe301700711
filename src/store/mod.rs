//! # Document Store Capability
//!
//! The upload pipeline depends only on the traits in this module. A
//! [`StoreHandle`] is handed over already authenticated; it hands out
//! [`CollectionRef`]s, opens atomic [`BatchHandle`]s and performs single
//! document writes for the fallback path.
//!
//! Implementations:
//! - [`memory::MemoryStore`] - in-process store with failure injection
//! - [`firestore::FirestoreStore`] - Firestore REST adapter

pub mod firestore;
pub mod memory;

use crate::error::WriteFailure;
use crate::models::{EnrichedRecord, ServerTimeMarker};
use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

pub use firestore::FirestoreStore;
pub use memory::{MemoryStore, StoredDocument};

pub type WriteResult = std::result::Result<(), WriteFailure>;

/// Pre-authenticated handle to a document store
#[async_trait]
pub trait StoreHandle: Send + Sync {
    /// Reference a collection by name. No network call is made.
    fn collection(&self, name: &str) -> CollectionRef {
        CollectionRef::new(name)
    }

    /// Open an empty atomic write batch
    fn batch(&self) -> Box<dyn BatchHandle>;

    /// Write one document outside of any batch
    async fn set(&self, doc: &DocumentRef, payload: &EnrichedRecord) -> WriteResult;

    /// Marker the store replaces with its own clock at commit time
    fn server_time(&self) -> ServerTimeMarker {
        ServerTimeMarker
    }
}

/// Staged writes that are committed all-or-nothing
#[async_trait]
pub trait BatchHandle: Send {
    /// Stage a full-document write
    fn set(&mut self, doc: DocumentRef, payload: EnrichedRecord);

    /// Number of staged writes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Submit every staged write as one atomic unit
    async fn commit(self: Box<Self>) -> WriteResult;
}

/// Reference to a top-level collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    name: String,
}

impl CollectionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocate a reference to a new document with a generated identifier
    pub fn doc(&self) -> DocumentRef {
        DocumentRef {
            collection: self.name.clone(),
            id: Uuid::new_v4().simple().to_string(),
        }
    }
}

/// Reference to a single document within a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    collection: String,
    id: String,
}

impl DocumentRef {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path relative to the database root, `collection/id`
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
