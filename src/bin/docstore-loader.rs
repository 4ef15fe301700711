//! # Docstore Loader CLI
//!
//! Uploads a JSON array of records into a document store collection in
//! atomic batches, falling back to single-document writes for batches the
//! store rejects.

use anyhow::Context;
use clap::Parser;
use docstore_loader::config::LoaderConfig;
use docstore_loader::constants::FORCED_EXIT_CODE;
use docstore_loader::input::load_records;
use docstore_loader::logging::{init_structured_logging, level_for_verbosity};
use docstore_loader::store::{FirestoreStore, MemoryStore, StoreHandle};
use docstore_loader::upload::{InstantPacer, Pacer, TokioPacer, UploadOptions, UploadOrchestrator};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "docstore-loader")]
#[command(about = "Bulk upload JSON records into a document store collection")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (default: loader.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of records to upload
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Target collection name
    #[arg(long)]
    collection: Option<String>,

    /// Records per atomic batch (1-500)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Upload into an in-memory store instead of the remote one
    #[arg(long)]
    dry_run: bool,

    /// Exit with status 2 when some records could not be uploaded
    #[arg(long)]
    fail_on_partial: bool,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut LoaderConfig) {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        config.dry_run |= self.dry_run;
        config.fail_on_partial |= self.fail_on_partial;
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Upload aborted: {e:#}");
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = LoaderConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    init_structured_logging(config.log_format, level_for_verbosity(cli.verbose));
    config.validate()?;
    info!(config = %config.sanitized(), "Configuration validated");

    let records = load_records(&config.input_path)?;

    let cancel = CancellationToken::new();
    let store: Arc<dyn StoreHandle>;
    let pacer: Arc<dyn Pacer>;
    if config.dry_run {
        warn!("Dry run: writing to an in-memory store");
        store = Arc::new(MemoryStore::new());
        pacer = Arc::new(InstantPacer::new());
    } else {
        store = Arc::new(FirestoreStore::connect(&config).context("failed to connect to the store")?);
        pacer = Arc::new(TokioPacer::with_cancellation(cancel.clone()));
    }
    spawn_ctrl_c_handler(cancel.clone());

    let mut uploader = UploadOrchestrator::new(
        store,
        pacer,
        &config.collection,
        UploadOptions::from_config(&config),
    )?
    .with_cancellation(cancel);
    let summary = uploader.run(&records).await?;

    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }

    Ok(summary.exit_code(config.fail_on_partial))
}

/// First Ctrl-C stops the run after the write in flight; a second one exits at once
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, stopping after the write in flight (press Ctrl-C again to exit now)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("Second interrupt received, exiting without a summary");
            process::exit(FORCED_EXIT_CODE);
        }
    });
}
