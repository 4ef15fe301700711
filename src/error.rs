//! # Loader Error Types
//!
//! Two tiers of failure: [`LoaderError`] aborts a run before any write is
//! attempted, while [`WriteFailure`] describes a single rejected commit and is
//! always recovered or tolerated by the upload pipeline.

use std::time::Duration;
use thiserror::Error;

/// Fatal errors raised while preparing a run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfiguration { field: String, message: String },

    #[error("Failed to load input records from '{path}': {message}")]
    Input { path: String, message: String },

    #[error("Store connection error: {message}")]
    StoreConnection { message: String },
}

impl LoaderError {
    pub fn invalid_configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn store_connection(message: impl Into<String>) -> Self {
        Self::StoreConnection {
            message: message.into(),
        }
    }
}

/// Reason a single commit (batch or individual document) did not land
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteFailure {
    /// The store answered and refused the write (size limit, permission, invalid payload)
    #[error("write rejected by store: {message}")]
    Rejected { message: String },

    /// The request never got a definitive answer from the store
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The commit deadline elapsed before the store responded
    #[error("commit timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },
}

impl WriteFailure {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Transport failures and timeouts may succeed if attempted again; rejections will not
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Short stable label for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
        }
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
