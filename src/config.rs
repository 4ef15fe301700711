//! # Loader Configuration
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults ([`LoaderConfig::default`])
//! 2. An optional TOML file (`loader.toml` in the working directory, or an explicit path)
//! 3. Variables from a `.env` file
//! 4. The process environment
//!
//! Command-line flags are applied on top by the binary before [`LoaderConfig::validate`]
//! is called. Nothing is written to the store until validation passes.
//!
//! ```rust,no_run
//! use docstore_loader::config::LoaderConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoaderConfig::load(None)?;
//! config.validate()?;
//! println!("uploading to {} in chunks of {}", config.collection, config.batch_size);
//! # Ok(())
//! # }
//! ```

use crate::constants::{self, env};
use crate::error::{LoaderError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Console output style for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(LoaderError::invalid_configuration(
                "log_format",
                format!("expected 'text' or 'json', got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Service credential file used to authenticate the store handle
    pub credentials_path: Option<PathBuf>,
    /// Store project to connect to
    pub project_id: Option<String>,
    /// Collection that receives the uploaded documents
    pub collection: String,
    /// JSON array of records to upload
    pub input_path: PathBuf,
    pub batch_size: usize,
    /// Pause after a clean chunk; doubled after a fallback chunk
    pub pacing_delay: Duration,
    pub commit_timeout: Duration,
    /// Exit non-zero when some records could not be uploaded
    pub fail_on_partial: bool,
    /// `host:port` of a local store emulator
    pub emulator_host: Option<String>,
    /// Pre-minted bearer token for the store's REST endpoint
    pub access_token: Option<String>,
    pub log_format: LogFormat,
    /// Write into an in-process store instead of the remote one
    pub dry_run: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            project_id: None,
            collection: String::new(),
            input_path: PathBuf::from(constants::DEFAULT_INPUT_PATH),
            batch_size: constants::DEFAULT_BATCH_SIZE,
            pacing_delay: constants::DEFAULT_PACING_DELAY,
            commit_timeout: constants::DEFAULT_COMMIT_TIMEOUT,
            fail_on_partial: false,
            emulator_host: None,
            access_token: None,
            log_format: LogFormat::Text,
            dry_run: false,
        }
    }
}

/// Shape of the optional TOML configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    credentials_path: Option<PathBuf>,
    project_id: Option<String>,
    collection: Option<String>,
    input_path: Option<PathBuf>,
    batch_size: Option<usize>,
    pacing_delay_ms: Option<u64>,
    commit_timeout_secs: Option<u64>,
    fail_on_partial: Option<bool>,
    emulator_host: Option<String>,
    log_format: Option<String>,
}

impl FileConfig {
    fn load(path: Option<&Path>) -> Result<Self> {
        let source = match path {
            Some(path) => ::config::File::from(path).required(true),
            None => ::config::File::with_name(constants::DEFAULT_CONFIG_FILE).required(false),
        };

        ::config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| LoaderError::invalid_configuration("config_file", e.to_string()))
    }
}

impl LoaderConfig {
    /// Load defaults, the optional config file, `.env` and the process environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("DOTENV: Loaded environment from {}", path.display()),
            Err(e) => debug!("DOTENV: No .env file loaded: {e}"),
        }

        let mut config = Self::default();
        config.apply_file(FileConfig::load(config_file)?)?;
        config.apply_env(|key| std::env::var(key).ok())?;

        debug!(config = %config.sanitized(), "Configuration loaded");
        Ok(config)
    }

    /// Build a configuration from defaults plus environment-style lookups only
    ///
    /// Accepts any lookup so callers can supply variables without touching the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(lookup)?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(path) = file.credentials_path {
            self.credentials_path = Some(path);
        }
        if let Some(project_id) = file.project_id {
            self.project_id = Some(project_id);
        }
        if let Some(collection) = file.collection {
            self.collection = collection;
        }
        if let Some(path) = file.input_path {
            self.input_path = path;
        }
        if let Some(size) = file.batch_size {
            self.batch_size = size;
        }
        if let Some(ms) = file.pacing_delay_ms {
            self.pacing_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = file.commit_timeout_secs {
            self.commit_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = file.fail_on_partial {
            self.fail_on_partial = flag;
        }
        if let Some(host) = file.emulator_host {
            self.emulator_host = Some(host);
        }
        if let Some(format) = file.log_format {
            self.log_format = format.parse()?;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(env::CREDENTIALS_PATH) {
            self.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(project_id) = get(env::PROJECT_ID) {
            self.project_id = Some(project_id);
        }
        if let Some(collection) = get(env::COLLECTION) {
            self.collection = collection;
        }
        if let Some(path) = get(env::INPUT_PATH) {
            self.input_path = PathBuf::from(path);
        }
        if let Some(size) = get(env::BATCH_SIZE) {
            self.batch_size = size.trim().parse().map_err(|e| {
                LoaderError::invalid_configuration("batch_size", format!("'{size}': {e}"))
            })?;
        }
        if let Some(ms) = get(env::PACING_DELAY_MS) {
            let ms: u64 = ms.trim().parse().map_err(|e| {
                LoaderError::invalid_configuration("pacing_delay_ms", format!("'{ms}': {e}"))
            })?;
            self.pacing_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = get(env::COMMIT_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                LoaderError::invalid_configuration("commit_timeout_secs", format!("'{secs}': {e}"))
            })?;
            self.commit_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = get(env::FAIL_ON_PARTIAL) {
            self.fail_on_partial = parse_bool("fail_on_partial", &flag)?;
        }
        if let Some(host) = get(env::EMULATOR_HOST) {
            self.emulator_host = Some(host);
        }
        if let Some(token) = get(env::ACCESS_TOKEN) {
            self.access_token = Some(token);
        }
        if let Some(format) = get(env::LOG_FORMAT) {
            self.log_format = format.parse()?;
        }
        Ok(())
    }

    /// Reject configurations that cannot produce a valid run
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LoaderError::invalid_configuration(
                "batch_size",
                "must be greater than zero",
            ));
        }
        if self.batch_size > constants::MAX_BATCH_SIZE {
            return Err(LoaderError::invalid_configuration(
                "batch_size",
                format!(
                    "{} exceeds the store limit of {} writes per batch",
                    self.batch_size,
                    constants::MAX_BATCH_SIZE
                ),
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(LoaderError::invalid_configuration(
                "collection",
                format!("required, set {}", env::COLLECTION),
            ));
        }
        if self.collection.contains('/') {
            return Err(LoaderError::invalid_configuration(
                "collection",
                "must be a top-level collection name without '/'",
            ));
        }
        if self.commit_timeout.is_zero() {
            return Err(LoaderError::invalid_configuration(
                "commit_timeout",
                "must be greater than zero",
            ));
        }

        if self.dry_run {
            return Ok(());
        }

        if self.project_id.is_none() && self.credentials_path.is_none() {
            return Err(LoaderError::invalid_configuration(
                "project_id",
                format!(
                    "set {} or provide a credential file via {}",
                    env::PROJECT_ID,
                    env::CREDENTIALS_PATH
                ),
            ));
        }
        if self.emulator_host.is_none() {
            match &self.credentials_path {
                None => {
                    return Err(LoaderError::invalid_configuration(
                        "credentials_path",
                        format!("required, set {}", env::CREDENTIALS_PATH),
                    ))
                }
                Some(path) if !path.is_file() => {
                    return Err(LoaderError::invalid_configuration(
                        "credentials_path",
                        format!("'{}' is not a readable file", path.display()),
                    ))
                }
                Some(_) => {}
            }
            if self.access_token.is_none() {
                return Err(LoaderError::invalid_configuration(
                    "access_token",
                    format!(
                        "required when not using the emulator, set {}",
                        env::ACCESS_TOKEN
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Pacing delay after a chunk that needed the per-record fallback
    pub fn fallback_delay(&self) -> Duration {
        self.pacing_delay * constants::FALLBACK_DELAY_MULTIPLIER
    }

    /// JSON view of the configuration with secrets masked, for logging
    pub fn sanitized(&self) -> serde_json::Value {
        serde_json::json!({
            "credentials_path": self.credentials_path.as_ref().map(|p| p.display().to_string()),
            "project_id": self.project_id,
            "collection": self.collection,
            "input_path": self.input_path.display().to_string(),
            "batch_size": self.batch_size,
            "pacing_delay_ms": self.pacing_delay.as_millis() as u64,
            "commit_timeout_secs": self.commit_timeout.as_secs(),
            "fail_on_partial": self.fail_on_partial,
            "emulator_host": self.emulator_host,
            "access_token": self.access_token.as_ref().map(|_| "***"),
            "dry_run": self.dry_run,
        })
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(LoaderError::invalid_configuration(
            field,
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
