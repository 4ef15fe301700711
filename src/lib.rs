#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Docstore Loader
//!
//! One-shot bulk loader that uploads an ordered collection of JSON records into
//! a document store whose batches are capped at 500 writes and whose sustained
//! write rate is limited.
//!
//! ## Pipeline
//!
//! Records are split into chunks of at most `batch_size`. Each chunk is
//! committed as a single atomic batch. When a batch is rejected, the chunk is
//! written again one document at a time so that one bad or oversized record
//! only costs itself. The run paces itself between chunks and reports how many
//! records landed.
//!
//! ## Module Organization
//!
//! - [`upload`] - chunker, writers, pacer and orchestrator
//! - [`store`] - store capability traits plus in-memory and Firestore implementations
//! - [`models`] - records and enriched payloads
//! - [`config`] - layered configuration
//! - [`error`] - fatal and per-write error types
//! - [`input`] - JSON input loading
//! - [`logging`] - tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docstore_loader::store::MemoryStore;
//! use docstore_loader::upload::{InstantPacer, UploadOptions, UploadOrchestrator};
//! use docstore_loader::input::parse_records;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let records = parse_records(r#"[{"title": "first"}, {"title": "second"}]"#)?;
//! let store = MemoryStore::new();
//! let mut uploader = UploadOrchestrator::new(
//!     Arc::new(store.clone()),
//!     Arc::new(InstantPacer::new()),
//!     "articles",
//!     UploadOptions::default(),
//! )?;
//!
//! let summary = uploader.run(&records).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod logging;
pub mod models;
pub mod store;
pub mod upload;

pub use crate::config::{LoaderConfig, LogFormat};
pub use error::{LoaderError, Result, WriteFailure};
pub use models::{EnrichedRecord, Record, ServerTimeMarker};
pub use store::{BatchHandle, CollectionRef, DocumentRef, StoreHandle};
pub use upload::{UploadOptions, UploadOrchestrator, UploadState, UploadStats, UploadSummary, WriteOutcome};
