//! # Loader Constants
//!
//! Operational limits of the target store and the environment variable names
//! the loader recognises.

use std::time::Duration;

/// Maximum number of writes the store accepts in one atomic batch
pub const MAX_BATCH_SIZE: usize = 500;

/// Chunk size used when none is configured
pub const DEFAULT_BATCH_SIZE: usize = MAX_BATCH_SIZE;

/// Pause between chunks after a clean batch commit. Doubled after a fallback.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(1000);

/// Multiplier applied to the pacing delay after a chunk took the fallback path
pub const FALLBACK_DELAY_MULTIPLIER: u32 = 2;

/// Deadline for a single commit round-trip
pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Input file read when no source is configured
pub const DEFAULT_INPUT_PATH: &str = "data.json";

/// Optional configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "loader.toml";

/// Exit status used when partial failures are configured to be fatal
pub const PARTIAL_FAILURE_EXIT_CODE: i32 = 2;

/// Exit status when a second interrupt ends the process immediately
pub const FORCED_EXIT_CODE: i32 = 130;

/// Server-stamped fields attached to every uploaded document
pub mod fields {
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    /// Field used to identify a record in logs
    pub const TITLE: &str = "title";
}

/// Environment variables recognised by the configuration layer
pub mod env {
    pub const CREDENTIALS_PATH: &str = "FIREBASE_AUTH_KEY_PATH";
    pub const PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
    pub const COLLECTION: &str = "COLLECTION_NAME";
    pub const INPUT_PATH: &str = "LOADER_INPUT_PATH";
    pub const BATCH_SIZE: &str = "LOADER_BATCH_SIZE";
    pub const PACING_DELAY_MS: &str = "LOADER_PACING_DELAY_MS";
    pub const COMMIT_TIMEOUT_SECS: &str = "LOADER_COMMIT_TIMEOUT_SECS";
    pub const FAIL_ON_PARTIAL: &str = "LOADER_FAIL_ON_PARTIAL";
    pub const EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";
    pub const ACCESS_TOKEN: &str = "FIRESTORE_ACCESS_TOKEN";
    pub const LOG_FORMAT: &str = "LOADER_LOG_FORMAT";
}
