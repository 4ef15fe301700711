//! # Upload Orchestrator
//!
//! Drives one upload run end to end:
//!
//! ```text
//! records ──▶ chunk() ──▶ for each chunk ──▶ commit_batch ──┬─ Committed ──────────────┐
//!                                                           └─ Failed ─▶ commit_individually ─┤
//!                                             pace (1x after commit, 2x after fallback) ◀──┘
//! ```
//!
//! Chunks are processed strictly in input order on a single task. A failed
//! batch is never retried as a batch; it goes straight to per-record writes.
//! The counters live in an [`UploadStats`] owned by the run and are reported
//! through the returned [`UploadSummary`].
//!
//! A cancellation token stops the run between chunks, during a pause, or
//! between the records of a fallback chunk. Whatever was not attempted is left
//! unaccounted and the summary is marked interrupted.

use super::batch_writer::commit_batch;
use super::chunker::{chunk, Chunk};
use super::fallback_writer::commit_individually;
use super::pacer::{PaceResult, Pacer};
use super::types::{RecordFailure, UploadState, UploadStats, UploadSummary, WriteOutcome};
use crate::config::LoaderConfig;
use crate::constants;
use crate::error::{LoaderError, Result};
use crate::models::Record;
use crate::store::{CollectionRef, StoreHandle};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Tuning knobs for a run
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub batch_size: usize,
    /// Pause after a chunk that committed atomically
    pub pacing_delay: Duration,
    /// Pause after a chunk that needed the fallback path
    pub fallback_delay: Duration,
    pub commit_timeout: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            batch_size: constants::DEFAULT_BATCH_SIZE,
            pacing_delay: constants::DEFAULT_PACING_DELAY,
            fallback_delay: constants::DEFAULT_PACING_DELAY * constants::FALLBACK_DELAY_MULTIPLIER,
            commit_timeout: constants::DEFAULT_COMMIT_TIMEOUT,
        }
    }
}

impl UploadOptions {
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            pacing_delay: config.pacing_delay,
            fallback_delay: config.fallback_delay(),
            commit_timeout: config.commit_timeout,
        }
    }
}

pub struct UploadOrchestrator {
    store: Arc<dyn StoreHandle>,
    pacer: Arc<dyn Pacer>,
    collection: CollectionRef,
    options: UploadOptions,
    cancel: CancellationToken,
    state: UploadState,
}

impl UploadOrchestrator {
    pub fn new(
        store: Arc<dyn StoreHandle>,
        pacer: Arc<dyn Pacer>,
        collection: &str,
        options: UploadOptions,
    ) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(LoaderError::invalid_configuration(
                "batch_size",
                "must be greater than zero",
            ));
        }
        let collection = store.collection(collection);

        Ok(Self {
            store,
            pacer,
            collection,
            options,
            cancel: CancellationToken::new(),
            state: UploadState::Idle,
        })
    }

    /// Stop the run early once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Upload `records` and report what landed
    ///
    /// Data-level failures never make this return an error; only an invalid
    /// chunk size does, before anything is written.
    #[instrument(skip_all, fields(collection = %self.collection.name(), records = records.len()))]
    pub async fn run(&mut self, records: &[Record]) -> Result<UploadSummary> {
        let chunks = chunk(records, self.options.batch_size)?;
        let total_chunks = chunks.len();
        let started_at = Utc::now();

        self.state = UploadState::Running;
        info!(
            total_records = records.len(),
            total_chunks,
            batch_size = self.options.batch_size,
            "Starting upload"
        );

        let mut stats = UploadStats::default();
        let mut record_failures = Vec::new();
        let mut interrupted = false;

        for chunk in &chunks {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let Some(delay) = self
                .process_chunk(chunk, total_chunks, &mut stats, &mut record_failures)
                .await
            else {
                interrupted = true;
                break;
            };

            let is_last = chunk.index() + 1 == total_chunks;
            if !is_last && self.pacer.pause(delay).await == PaceResult::Cancelled {
                interrupted = true;
                break;
            }
        }

        if interrupted {
            warn!(
                chunks_processed = stats.chunks_processed(),
                total_chunks, "Upload cancelled, skipping remaining records"
            );
        }

        self.state = UploadState::Completed;

        let summary = UploadSummary {
            collection: self.collection.name().to_string(),
            total_records: records.len(),
            total_chunks,
            total_processed: stats.total_processed,
            successful_batches: stats.successful_batches,
            failed_batches: stats.failed_batches,
            record_failures,
            interrupted,
            started_at,
            finished_at: Utc::now(),
        };

        if summary.is_complete() {
            info!(
                total_processed = summary.total_processed,
                successful_batches = summary.successful_batches,
                duration_ms = summary.duration_ms(),
                "Upload completed, all records stored"
            );
        } else {
            warn!(
                total_processed = summary.total_processed,
                unaccounted = summary.unaccounted(),
                failed_batches = summary.failed_batches,
                duration_ms = summary.duration_ms(),
                "Upload completed with missing records"
            );
        }

        Ok(summary)
    }

    /// Commit one chunk, falling back to single writes on failure.
    /// Returns the pause to take before the next chunk, or `None` when
    /// cancellation cut the fallback short.
    async fn process_chunk(
        &self,
        chunk: &Chunk<'_>,
        total_chunks: usize,
        stats: &mut UploadStats,
        record_failures: &mut Vec<RecordFailure>,
    ) -> Option<Duration> {
        let chunk_index = chunk.index();
        info!(
            chunk_index,
            total_chunks,
            chunk_len = chunk.len(),
            "Processing chunk"
        );

        let outcome = commit_batch(
            self.store.as_ref(),
            &self.collection,
            chunk,
            self.options.commit_timeout,
        )
        .await;

        let failure = match outcome {
            WriteOutcome::Committed => {
                stats.record_batch_committed(chunk.len());
                info!(chunk_index, uploaded = chunk.len(), "Batch committed");
                return Some(self.options.pacing_delay);
            }
            WriteOutcome::Failed(failure) => failure,
        };

        warn!(
            chunk_index,
            kind = failure.kind(),
            retryable = failure.is_retryable(),
            error = %failure,
            "Batch commit failed, retrying records individually"
        );

        let report = commit_individually(
            self.store.as_ref(),
            &self.collection,
            chunk,
            self.options.commit_timeout,
            &self.cancel,
        )
        .await;
        stats.record_batch_fallback(report.success_count);

        info!(
            chunk_index,
            succeeded = report.success_count,
            attempted = report.attempted(),
            "Individual upload results: {}/{} succeeded",
            report.success_count,
            chunk.len()
        );

        record_failures.extend(report.failures().filter_map(|o| {
            o.outcome.failure().map(|failure| RecordFailure {
                record_index: chunk.offset() + o.position,
                chunk_index,
                title: o.title.clone(),
                kind: failure.kind().to_string(),
                error: failure.to_string(),
                retryable: failure.is_retryable(),
            })
        }));

        (!report.interrupted).then_some(self.options.fallback_delay)
    }
}
