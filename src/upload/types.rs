//! # Upload Types
//!
//! Outcomes, counters and the final summary produced by an upload run.

use crate::constants::PARTIAL_FAILURE_EXIT_CODE;
use crate::error::WriteFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one commit, either a whole chunk or a single record
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Committed,
    Failed(WriteFailure),
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    pub fn failure(&self) -> Option<&WriteFailure> {
        match self {
            Self::Committed => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

impl From<Result<(), WriteFailure>> for WriteOutcome {
    fn from(result: Result<(), WriteFailure>) -> Self {
        match result {
            Ok(()) => Self::Committed,
            Err(failure) => Self::Failed(failure),
        }
    }
}

/// Outcome of a single fallback write, tagged with the record it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    /// Position of the record within its chunk
    pub position: usize,
    pub title: String,
    pub outcome: WriteOutcome,
}

/// Result of writing a chunk record-by-record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackReport {
    pub success_count: usize,
    pub outcomes: Vec<RecordOutcome>,
    /// Cancelled before every record of the chunk was attempted
    pub interrupted: bool,
}

impl FallbackReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_committed())
    }
}

/// A record that could not be written by either path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Zero-based position in the input
    pub record_index: usize,
    pub chunk_index: usize,
    pub title: String,
    pub kind: String,
    pub error: String,
    pub retryable: bool,
}

/// Counters owned by one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStats {
    pub total_processed: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
}

impl UploadStats {
    pub fn record_batch_committed(&mut self, chunk_len: usize) {
        self.successful_batches += 1;
        self.total_processed += chunk_len;
    }

    /// A failed batch counts once regardless of how many records the fallback saved
    pub fn record_batch_fallback(&mut self, fallback_successes: usize) {
        self.failed_batches += 1;
        self.total_processed += fallback_successes;
    }

    pub fn chunks_processed(&self) -> usize {
        self.successful_batches + self.failed_batches
    }
}

/// Lifecycle of an orchestrator run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    Running,
    Completed,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Final accounting of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub collection: String,
    pub total_records: usize,
    pub total_chunks: usize,
    pub total_processed: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    pub record_failures: Vec<RecordFailure>,
    /// The run stopped before every chunk was attempted
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl UploadSummary {
    /// Records from the input that are not known to be stored
    pub fn unaccounted(&self) -> usize {
        self.total_records.saturating_sub(self.total_processed)
    }

    /// Records that were attempted and rejected by every write path
    pub fn failed_records(&self) -> usize {
        self.record_failures.len()
    }

    /// Records skipped because the run was cancelled
    pub fn not_attempted(&self) -> usize {
        self.unaccounted().saturating_sub(self.failed_records())
    }

    pub fn is_complete(&self) -> bool {
        self.total_processed == self.total_records
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Process exit status for this run
    ///
    /// Incomplete runs only exit non-zero when `fail_on_partial` is set.
    pub fn exit_code(&self, fail_on_partial: bool) -> i32 {
        if fail_on_partial && !self.is_complete() {
            PARTIAL_FAILURE_EXIT_CODE
        } else {
            0
        }
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Upload summary for '{}':", self.collection)?;
        writeln!(f, "  Total records:      {}", self.total_records)?;
        writeln!(f, "  Processed records:  {}", self.total_processed)?;
        writeln!(f, "  Successful batches: {}/{}", self.successful_batches, self.total_chunks)?;
        writeln!(f, "  Failed batches:     {}/{}", self.failed_batches, self.total_chunks)?;
        if self.interrupted {
            writeln!(
                f,
                "Upload interrupted after {} of {} chunks.",
                self.successful_batches + self.failed_batches,
                self.total_chunks
            )?;
        }
        if self.is_complete() {
            return write!(f, "All records were uploaded successfully.");
        }

        let mut lines = Vec::with_capacity(2);
        if self.failed_records() > 0 {
            lines.push(format!("{} records failed to upload.", self.failed_records()));
        }
        if self.not_attempted() > 0 {
            lines.push(format!("{} records were not attempted.", self.not_attempted()));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(record_index: usize) -> RecordFailure {
        RecordFailure {
            record_index,
            chunk_index: 0,
            title: format!("record-{record_index}"),
            kind: "rejected".to_string(),
            error: "write rejected by store: too big".to_string(),
            retryable: false,
        }
    }

    fn summary(total_records: usize, total_processed: usize) -> UploadSummary {
        let now = Utc::now();
        UploadSummary {
            collection: "articles".to_string(),
            total_records,
            total_chunks: 1,
            total_processed,
            successful_batches: 0,
            failed_batches: 1,
            record_failures: (total_processed..total_records).map(failure).collect(),
            interrupted: false,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_stats_count_chunks_not_records() {
        let mut stats = UploadStats::default();
        stats.record_batch_committed(500);
        stats.record_batch_fallback(2);
        assert_eq!(stats.total_processed, 502);
        assert_eq!(stats.successful_batches, 1);
        assert_eq!(stats.failed_batches, 1);
        assert_eq!(stats.chunks_processed(), 2);
    }

    #[test]
    fn test_exit_code_policy() {
        assert_eq!(summary(10, 10).exit_code(true), 0);
        assert_eq!(summary(10, 9).exit_code(false), 0);
        assert_eq!(summary(10, 9).exit_code(true), 2);
    }

    #[test]
    fn test_summary_text_reports_unaccounted() {
        let text = summary(10, 9).to_string();
        assert!(text.contains("Processed records:  9"));
        assert!(text.contains("Failed batches:     1/1"));
        assert!(text.ends_with("1 records failed to upload."));

        let text = summary(3, 3).to_string();
        assert!(text.ends_with("All records were uploaded successfully."));
    }

    #[test]
    fn test_interrupted_summary_separates_skipped_from_failed() {
        let mut interrupted = summary(10, 4);
        interrupted.record_failures.truncate(1);
        interrupted.interrupted = true;

        assert_eq!(interrupted.failed_records(), 1);
        assert_eq!(interrupted.not_attempted(), 5);
        let text = interrupted.to_string();
        assert!(text.contains("Upload interrupted after 1 of 1 chunks."));
        assert!(text.contains("1 records failed to upload."));
        assert!(text.ends_with("5 records were not attempted."));
    }

    #[test]
    fn test_outcome_from_result() {
        assert!(WriteOutcome::from(Ok(())).is_committed());
        let failed = WriteOutcome::from(Err(WriteFailure::rejected("nope")));
        assert_eq!(failed.failure(), Some(&WriteFailure::rejected("nope")));
    }
}
