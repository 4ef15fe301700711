//! # Firestore REST Adapter
//!
//! Implements [`StoreHandle`] on top of the Firestore `documents:commit` REST
//! endpoint. A batch is a single commit request carrying every staged write;
//! individual writes are commits with one write. `createdAt` and `updatedAt`
//! are sent as `REQUEST_TIME` field transforms so the server stamps them.
//!
//! Authentication is limited to a pre-minted bearer token, or none at all when
//! talking to the local emulator.

use super::{BatchHandle, DocumentRef, StoreHandle, WriteResult};
use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result, WriteFailure};
use crate::models::EnrichedRecord;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{debug, info};

const PRODUCTION_ENDPOINT: &str = "https://firestore.googleapis.com";
const EMULATOR_TOKEN: &str = "owner";

#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: Client,
    commit_url: String,
    /// `projects/{project}/databases/(default)/documents`
    documents_root: String,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    project_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl FirestoreStore {
    /// Build a store handle from validated configuration
    pub fn connect(config: &LoaderConfig) -> Result<Self> {
        let project_id = match (&config.project_id, &config.credentials_path) {
            (Some(project_id), _) => project_id.clone(),
            (None, Some(path)) => read_project_id(path)?,
            (None, None) => {
                return Err(LoaderError::store_connection(
                    "no project id configured and no credential file to read it from",
                ))
            }
        };

        let (endpoint, token) = match &config.emulator_host {
            Some(host) => (format!("http://{host}"), EMULATOR_TOKEN.to_string()),
            None => {
                let token = config.access_token.clone().ok_or_else(|| {
                    LoaderError::store_connection("an access token is required for the production endpoint")
                })?;
                (PRODUCTION_ENDPOINT.to_string(), token)
            }
        };

        info!(
            project_id = %project_id,
            endpoint = %endpoint,
            emulator = config.emulator_host.is_some(),
            "Connecting to Firestore"
        );

        Self::new(&endpoint, &project_id, &token, config.commit_timeout)
    }

    pub fn new(
        endpoint: &str,
        project_id: &str,
        token: &str,
        request_timeout: std::time::Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| LoaderError::store_connection(format!("invalid access token: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Slightly longer than the pipeline's own deadline so the pipeline reports the timeout
        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout.saturating_add(std::time::Duration::from_secs(5)))
            .build()
            .map_err(|e| LoaderError::store_connection(format!("failed to build HTTP client: {e}")))?;

        let database = format!("projects/{project_id}/databases/(default)");
        Ok(Self {
            client,
            commit_url: format!("{}/v1/{database}/documents:commit", endpoint.trim_end_matches('/')),
            documents_root: format!("{database}/documents"),
        })
    }

    fn document_name(&self, doc: &DocumentRef) -> String {
        format!("{}/{}", self.documents_root, doc.path())
    }

    fn encode_write(&self, doc: &DocumentRef, payload: &EnrichedRecord) -> Value {
        let server_fields = payload.server_time_fields();
        let fields: Map<String, Value> = payload
            .fields()
            .iter()
            .filter(|(name, _)| !server_fields.iter().any(|(f, _)| *f == name.as_str()))
            .map(|(name, value)| (name.clone(), encode_value(value)))
            .collect();
        let transforms: Vec<Value> = server_fields
            .iter()
            .map(|(name, _)| json!({ "fieldPath": name, "setToServerValue": "REQUEST_TIME" }))
            .collect();

        json!({
            "update": { "name": self.document_name(doc), "fields": fields },
            "updateTransforms": transforms,
        })
    }

    async fn commit_writes(&self, writes: Vec<Value>) -> WriteResult {
        let count = writes.len();
        let response = self
            .client
            .post(&self.commit_url)
            .json(&json!({ "writes": writes }))
            .send()
            .await
            .map_err(|e| WriteFailure::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(writes = count, "Firestore commit accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_response(status, &body))
    }
}

#[async_trait]
impl StoreHandle for FirestoreStore {
    fn batch(&self) -> Box<dyn BatchHandle> {
        Box::new(FirestoreBatch {
            store: self.clone(),
            writes: Vec::new(),
        })
    }

    async fn set(&self, doc: &DocumentRef, payload: &EnrichedRecord) -> WriteResult {
        let write = self.encode_write(doc, payload);
        self.commit_writes(vec![write]).await
    }
}

struct FirestoreBatch {
    store: FirestoreStore,
    writes: Vec<Value>,
}

#[async_trait]
impl BatchHandle for FirestoreBatch {
    fn set(&mut self, doc: DocumentRef, payload: EnrichedRecord) {
        let write = self.store.encode_write(&doc, &payload);
        self.writes.push(write);
    }

    fn len(&self) -> usize {
        self.writes.len()
    }

    async fn commit(self: Box<Self>) -> WriteResult {
        let FirestoreBatch { store, writes } = *self;
        store.commit_writes(writes).await
    }
}

/// Read `project_id` from a service account key file
pub fn read_project_id(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        LoaderError::store_connection(format!("cannot read credential file '{}': {e}", path.display()))
    })?;
    let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
        LoaderError::store_connection(format!("credential file '{}' is not valid JSON: {e}", path.display()))
    })?;
    key.project_id.ok_or_else(|| {
        LoaderError::store_connection(format!(
            "credential file '{}' has no project_id",
            path.display()
        ))
    })
}

/// Map a non-success commit response onto a write failure
fn classify_response(status: StatusCode, body: &str) -> WriteFailure {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{code}: {}", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{status}: {}", body.trim()),
    };

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        WriteFailure::transport(message)
    } else {
        WriteFailure::rejected(message)
    }
}

/// Convert a JSON value into Firestore's typed value encoding
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(f64::NAN) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}
