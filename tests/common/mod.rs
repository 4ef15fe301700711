//! Shared helpers for integration tests

use docstore_loader::store::MemoryStore;
use docstore_loader::upload::{InstantPacer, UploadOptions, UploadOrchestrator};
use docstore_loader::Record;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const COLLECTION: &str = "articles";

/// `n` records titled `record-0` .. `record-{n-1}`
pub fn titled_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record::from_value(json!({ "title": format!("record-{i}"), "rank": i })).unwrap())
        .collect()
}

pub fn options(batch_size: usize) -> UploadOptions {
    UploadOptions {
        batch_size,
        pacing_delay: Duration::from_millis(1000),
        fallback_delay: Duration::from_millis(2000),
        commit_timeout: Duration::from_secs(30),
    }
}

/// Orchestrator over a clone of `store` that records pauses instead of sleeping
pub fn uploader(store: &MemoryStore, batch_size: usize) -> (UploadOrchestrator, Arc<InstantPacer>) {
    let pacer = Arc::new(InstantPacer::new());
    let orchestrator = UploadOrchestrator::new(
        Arc::new(store.clone()),
        pacer.clone(),
        COLLECTION,
        options(batch_size),
    )
    .unwrap();
    (orchestrator, pacer)
}
