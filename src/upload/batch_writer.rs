//! # Batch Writer
//!
//! Commits one chunk as a single atomic batch. Every record gets a freshly
//! allocated document reference; the store either applies all staged writes
//! or none of them. A failure is returned as [`WriteOutcome::Failed`] so the
//! caller can fall back to per-record writes.

use super::chunker::Chunk;
use super::enricher::enrich;
use super::types::WriteOutcome;
use crate::error::WriteFailure;
use crate::store::{CollectionRef, StoreHandle};
use std::time::Duration;
use tracing::{debug, instrument};

#[instrument(skip_all, fields(collection = %collection.name(), chunk_index = chunk.index(), chunk_len = chunk.len()))]
pub async fn commit_batch(
    handle: &dyn StoreHandle,
    collection: &CollectionRef,
    chunk: &Chunk<'_>,
    commit_timeout: Duration,
) -> WriteOutcome {
    let now = handle.server_time();
    let mut batch = handle.batch();
    for (position, record) in chunk.records().iter().enumerate() {
        let doc = collection.doc();
        debug!(
            record_index = chunk.offset() + position,
            doc = %doc,
            title = record.title(),
            "Staging record"
        );
        batch.set(doc, enrich(record, now));
    }

    // Nothing staged means nothing to commit
    if batch.is_empty() {
        return WriteOutcome::Committed;
    }

    match tokio::time::timeout(commit_timeout, batch.commit()).await {
        Ok(result) => result.into(),
        Err(_) => WriteOutcome::Failed(WriteFailure::Timeout {
            timeout: commit_timeout,
        }),
    }
}
