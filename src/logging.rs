//! # Structured Logging Module
//!
//! Console logging through the tracing ecosystem. The level is taken from
//! `RUST_LOG` when set, otherwise from the verbosity requested by the caller.

use crate::config::LogFormat;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Map `-v` repetitions onto a default filter directive
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize structured logging once per process
pub fn init_structured_logging(format: LogFormat, default_level: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        let layer = match format {
            LogFormat::Text => fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
        };

        // A subscriber may already be installed by an embedding application or a test harness
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::debug!(format = ?format, level = default_level, "Structured logging initialized");
    });
}
