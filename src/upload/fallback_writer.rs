//! # Fallback Writer
//!
//! Writes a chunk one record at a time after its batch commit failed. Each
//! write is independent: a rejected record is reported and the remaining
//! records are still attempted, in chunk order. Cancellation is observed
//! between records; the write in flight is bounded by the commit timeout.

use super::chunker::Chunk;
use super::enricher::enrich;
use super::types::{FallbackReport, RecordOutcome, WriteOutcome};
use crate::error::WriteFailure;
use crate::store::{CollectionRef, StoreHandle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

#[instrument(skip_all, fields(collection = %collection.name(), chunk_index = chunk.index(), chunk_len = chunk.len()))]
pub async fn commit_individually(
    handle: &dyn StoreHandle,
    collection: &CollectionRef,
    chunk: &Chunk<'_>,
    commit_timeout: Duration,
    cancel: &CancellationToken,
) -> FallbackReport {
    let now = handle.server_time();
    let mut report = FallbackReport {
        success_count: 0,
        outcomes: Vec::with_capacity(chunk.len()),
        interrupted: false,
    };

    for (position, record) in chunk.records().iter().enumerate() {
        if cancel.is_cancelled() {
            warn!(
                attempted = position,
                remaining = chunk.len() - position,
                "Cancelled, leaving remaining records of the chunk unattempted"
            );
            report.interrupted = true;
            break;
        }

        let doc = collection.doc();
        let payload = enrich(record, now);

        let outcome = match tokio::time::timeout(commit_timeout, handle.set(&doc, &payload)).await {
            Ok(result) => WriteOutcome::from(result),
            Err(_) => WriteOutcome::Failed(WriteFailure::Timeout {
                timeout: commit_timeout,
            }),
        };

        match &outcome {
            WriteOutcome::Committed => report.success_count += 1,
            WriteOutcome::Failed(failure) => warn!(
                record_index = chunk.offset() + position,
                title = record.title(),
                kind = failure.kind(),
                error = %failure,
                "Individual document upload failed"
            ),
        }

        report.outcomes.push(RecordOutcome {
            position,
            title: record.title().to_string(),
            outcome,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichedRecord, Record};
    use crate::store::{BatchHandle, DocumentRef, MemoryStore, WriteResult};
    use crate::upload::chunker::chunk;
    use async_trait::async_trait;
    use serde_json::json;

    fn records(titles: &[&str]) -> Vec<Record> {
        titles
            .iter()
            .map(|t| Record::from_value(json!({ "title": t })).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_one_bad_record_does_not_stop_the_rest() {
        let store = MemoryStore::new().with_rejection(|p| p.title() == "b");
        let collection = CollectionRef::new("articles");
        let input = records(&["a", "b", "c"]);
        let chunks = chunk(&input, 3).unwrap();

        let report = commit_individually(
            &store,
            &collection,
            &chunks[0],
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(report.success_count, 2);
        assert_eq!(report.attempted(), 3);
        assert!(!report.interrupted);
        let failed: Vec<_> = report.failures().map(|o| (o.position, o.title.as_str())).collect();
        assert_eq!(failed, vec![(1, "b")]);
        assert_eq!(store.single_writes(), 2);
    }

    #[tokio::test]
    async fn test_outcomes_follow_chunk_order() {
        let store = MemoryStore::new();
        let collection = CollectionRef::new("articles");
        let input = records(&["x", "y", "z"]);
        let chunks = chunk(&input, 3).unwrap();

        let report = commit_individually(
            &store,
            &collection,
            &chunks[0],
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;

        let titles: Vec<_> = report.outcomes.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["x", "y", "z"]);
        assert_eq!(report.success_count, report.outcomes.len());
        let stored: Vec<_> = store
            .documents("articles")
            .iter()
            .map(|d| d.title().unwrap().to_string())
            .collect();
        assert_eq!(stored, vec!["x", "y", "z"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_are_reported_per_record() {
        let store = MemoryStore::new().with_latency(Duration::from_secs(120));
        let collection = CollectionRef::new("articles");
        let input = records(&["slow-1", "slow-2"]);
        let chunks = chunk(&input, 2).unwrap();

        let report = commit_individually(
            &store,
            &collection,
            &chunks[0],
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(report.success_count, 0);
        assert!(report
            .failures()
            .all(|o| matches!(o.outcome, WriteOutcome::Failed(WriteFailure::Timeout { .. }))));
    }

    /// Cancels the token once `after` single writes have landed
    struct CancellingStore {
        inner: MemoryStore,
        cancel: CancellationToken,
        after: usize,
    }

    #[async_trait]
    impl StoreHandle for CancellingStore {
        fn batch(&self) -> Box<dyn BatchHandle> {
            self.inner.batch()
        }

        async fn set(&self, doc: &DocumentRef, payload: &EnrichedRecord) -> WriteResult {
            let result = self.inner.set(doc, payload).await;
            if self.inner.single_writes() >= self.after {
                self.cancel.cancel();
            }
            result
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_records() {
        let cancel = CancellationToken::new();
        let store = CancellingStore {
            inner: MemoryStore::new(),
            cancel: cancel.clone(),
            after: 2,
        };
        let collection = CollectionRef::new("articles");
        let input = records(&["a", "b", "c", "d", "e"]);
        let chunks = chunk(&input, 5).unwrap();

        let report =
            commit_individually(&store, &collection, &chunks[0], Duration::from_secs(5), &cancel).await;

        assert!(report.interrupted);
        assert_eq!(report.attempted(), 2);
        assert_eq!(report.success_count, 2);
        assert_eq!(store.inner.document_count("articles"), 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_attempts_nothing() {
        let store = MemoryStore::new();
        let collection = CollectionRef::new("articles");
        let input = records(&["a", "b"]);
        let chunks = chunk(&input, 2).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report =
            commit_individually(&store, &collection, &chunks[0], Duration::from_secs(5), &cancel).await;

        assert!(report.interrupted);
        assert_eq!(report.attempted(), 0);
        assert_eq!(store.single_writes(), 0);
    }
}
