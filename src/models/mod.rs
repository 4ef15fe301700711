//! # Data Models
//!
//! Records as received from the input source and the enriched payloads
//! handed to the store.

pub mod record;

pub use record::{EnrichedRecord, Record, ServerTimeMarker};
