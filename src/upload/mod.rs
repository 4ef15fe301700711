//! # Upload Pipeline
//!
//! Chunked batch writes with per-record fallback and progress accounting.
//!
//! - [`chunker`] - splits the input into bounded, ordered chunks
//! - [`enricher`] - attaches server time markers to a copy of each record
//! - [`batch_writer`] - commits a chunk atomically
//! - [`fallback_writer`] - writes a chunk record-by-record after a failed batch
//! - [`pacer`] - cancellable delays between chunks
//! - [`orchestrator`] - drives the run and produces the [`UploadSummary`]

pub mod batch_writer;
pub mod chunker;
pub mod enricher;
pub mod fallback_writer;
pub mod orchestrator;
pub mod pacer;
pub mod types;

pub use batch_writer::commit_batch;
pub use chunker::{chunk, Chunk};
pub use enricher::enrich;
pub use fallback_writer::commit_individually;
pub use orchestrator::{UploadOptions, UploadOrchestrator};
pub use pacer::{InstantPacer, PaceResult, Pacer, TokioPacer};
pub use types::{
    FallbackReport, RecordFailure, RecordOutcome, UploadState, UploadStats, UploadSummary,
    WriteOutcome,
};
