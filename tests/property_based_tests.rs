mod common;

use common::{titled_records, uploader};
use docstore_loader::store::MemoryStore;
use docstore_loader::upload::chunk;
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    /// Property: chunks reproduce the input exactly and in order
    #[test]
    fn chunks_concatenate_to_input(len in 0usize..2000, size in 1usize..600) {
        let records = titled_records(len);
        let chunks = chunk(&records, size).unwrap();

        prop_assert_eq!(chunks.len(), len.div_ceil(size));
        let rejoined: Vec<_> = chunks.iter().flat_map(|c| c.iter().cloned()).collect();
        prop_assert_eq!(rejoined, records);
    }

    /// Property: every chunk is non-empty and bounded, only the last may be short
    #[test]
    fn chunk_sizes_are_bounded(len in 1usize..2000, size in 1usize..600) {
        let records = titled_records(len);
        let chunks = chunk(&records, size).unwrap();

        for (i, c) in chunks.iter().enumerate() {
            prop_assert!(!c.is_empty());
            prop_assert!(c.len() <= size);
            prop_assert_eq!(c.offset(), i * size);
            if i + 1 < chunks.len() {
                prop_assert_eq!(c.len(), size);
            }
        }
    }

    /// Property: processed records never exceed the input, and equal it exactly
    /// when no fallback write failed; pacing happens once between each pair of chunks
    #[test]
    fn counters_are_conserved(
        len in 0usize..60,
        size in 1usize..12,
        rejected in proptest::collection::hash_set(0usize..60, 0..6),
    ) {
        let rejected_titles: HashSet<String> = rejected
            .iter()
            .filter(|i| **i < len)
            .map(|i| format!("record-{i}"))
            .collect();
        let expected_failures = rejected_titles.len();
        let store = MemoryStore::new()
            .with_rejection(move |p| rejected_titles.contains(p.title()));
        let (mut orchestrator, pacer) = uploader(&store, size);
        let records = titled_records(len);

        let summary = tokio_test::block_on(orchestrator.run(&records)).unwrap();

        prop_assert!(summary.total_processed <= len);
        prop_assert_eq!(summary.total_processed, len - expected_failures);
        prop_assert_eq!(summary.is_complete(), expected_failures == 0);
        prop_assert_eq!(summary.successful_batches + summary.failed_batches, summary.total_chunks);
        prop_assert_eq!(pacer.pause_count(), summary.total_chunks.saturating_sub(1));
        prop_assert_eq!(store.document_count(common::COLLECTION), summary.total_processed);
    }
}
