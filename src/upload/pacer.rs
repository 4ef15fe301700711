//! # Pacing
//!
//! The orchestrator pauses between chunks to stay under the store's
//! sustained write rate. Pauses can be cut short through a cancellation token.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceResult {
    /// The full delay elapsed
    Elapsed,
    /// The pause was cancelled; the caller should stop issuing writes
    Cancelled,
}

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration) -> PaceResult;
}

/// Sleeps on the tokio timer, waking early when cancelled
#[derive(Debug, Clone, Default)]
pub struct TokioPacer {
    cancel: CancellationToken,
}

impl TokioPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) -> PaceResult {
        debug!(delay_ms = delay.as_millis() as u64, "Pacing before next chunk");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => PaceResult::Cancelled,
            _ = tokio::time::sleep(delay) => PaceResult::Elapsed,
        }
    }
}

/// Returns immediately and remembers every requested delay
///
/// Used for dry runs against the in-memory store, where there is no rate limit.
#[derive(Debug, Default)]
pub struct InstantPacer {
    delays: Mutex<Vec<Duration>>,
}

impl InstantPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    pub fn pause_count(&self) -> usize {
        self.delays.lock().len()
    }
}

#[async_trait]
impl Pacer for InstantPacer {
    async fn pause(&self, delay: Duration) -> PaceResult {
        self.delays.lock().push(delay);
        PaceResult::Elapsed
    }
}
