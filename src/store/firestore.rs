//! Firestore REST store
//!
//! Talks to the Firestore REST API v1:
//! - `documents:runQuery` for ordered and unordered queries
//! - `documents:listCollectionIds` for discovery

use super::json_array::ArraySplitter;
use super::value::{decode_fields, decode_value, encode_value};
use super::{Document, DocumentStore, DocumentStream};
use crate::auth::{AuthConfig, Authenticator, ServiceAccountKey};
use crate::config::{TapConfig, DEFAULT_DATABASE_ID};
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, OptionStringExt};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Public Firestore endpoint
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";

const LIST_COLLECTIONS_PAGE_SIZE: u32 = 300;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// gRPC status code for UNAVAILABLE
const RPC_UNAVAILABLE: i32 = 14;

/// Typed ordering values keyed by (collection, field)
type LastKeys = Arc<Mutex<HashMap<(String, String), (JsonValue, JsonValue)>>>;

/// Document store backed by the Firestore REST API
pub struct FirestoreStore {
    client: Client,
    authenticator: Authenticator,
    base_url: String,
    project_id: String,
    database_id: String,
    /// Optional limit on each whole request, off by default
    request_timeout: Option<Duration>,
    /// Typed value of the last ordering key served per (collection, field).
    /// Plain JSON loses the distinction between timestamps and strings, so
    /// the next page's cursor is re-encoded from this when it matches.
    last_keys: LastKeys,
}

impl FirestoreStore {
    /// Create a store for a project
    pub fn new(project_id: impl Into<String>, auth: AuthConfig) -> Result<Self> {
        // No overall request timeout: unbounded reads may stream for a long time
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("tap-firestore/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Http)?;
        let authenticator = Authenticator::with_client(auth, client.clone());

        Ok(Self {
            client,
            authenticator,
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            request_timeout: None,
            last_keys: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Build an authorized store from the tap configuration
    pub fn from_config(config: &TapConfig) -> Result<Self> {
        let key = ServiceAccountKey::from_file(&config.service_account_path)?;
        let project_id = config
            .project_id
            .clone()
            .none_if_empty()
            .or_else(|| key.project_id.clone().none_if_empty())
            .ok_or_else(|| Error::missing_field("project_id"))?;

        if let Some(options) = &config.firebase_options {
            info!("Firebase options supplied: {}", JsonValue::Object(options.clone()));
        }

        let store = Self::new(project_id, AuthConfig::service_account(&key))?
            .with_database(&config.database_id)
            .with_request_timeout(config.request_timeout_seconds.map(Duration::from_secs));
        match &config.base_url {
            Some(base_url) => store.with_base_url(base_url),
            None => Ok(store),
        }
    }

    /// Point the store at another endpoint (emulator, mock server)
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        self.base_url = parsed.as_str().trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Use a named database
    #[must_use]
    pub fn with_database(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = database_id.into();
        self
    }

    /// Limit each request to `timeout` in total; `None` waits as long as the body streams
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Project being read
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Per-request timeout, if one was configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    fn documents_url(&self, action: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents:{action}",
            self.base_url, self.project_id, self.database_id
        )
    }

    /// POST to a documents action, classifying failures
    async fn post(&self, action: &str, body: &JsonValue) -> Result<Response> {
        let url = self.documents_url(action);
        let mut req = self.client.post(&url).json(body);
        if let Some(timeout) = self.request_timeout {
            req = req.timeout(timeout);
        }
        let req = self.authenticator.apply(req).await?;

        let response = req.send().await.map_err(Error::Http)?;
        let status = response.status();

        if status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::unavailable(format!("{action}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        debug!("Request succeeded: POST {url}");
        Ok(response)
    }

    /// Start a query; documents are decoded as the response body arrives
    async fn run_query(
        &self,
        structured_query: JsonValue,
        ordering: Option<CursorKey>,
    ) -> Result<DocumentStream> {
        let response = self
            .post("runQuery", &json!({ "structuredQuery": structured_query }))
            .await?;

        let state = QueryBody {
            chunks: Box::pin(response.bytes_stream()),
            splitter: ArraySplitter::new(),
            pending: VecDeque::new(),
            exhausted: false,
            ordering,
        };
        Ok(Box::pin(stream::try_unfold(state, next_document)))
    }

    /// Encode a cursor, preferring the typed value remembered for it
    fn encode_cursor(&self, collection: &str, field: &str, after: &JsonValue) -> JsonValue {
        let last_keys = self.last_keys.lock().unwrap_or_else(PoisonError::into_inner);
        match last_keys.get(&(collection.to_string(), field.to_string())) {
            Some((plain, typed)) if plain == after => typed.clone(),
            _ => encode_value(after),
        }
    }
}

/// Where to remember the typed ordering value of each served document
struct CursorKey {
    last_keys: LastKeys,
    collection: String,
    field: String,
}

impl CursorKey {
    fn remember(&self, doc: &RawDocument) -> Result<()> {
        let Some(typed) = typed_field(&doc.fields, &self.field) else {
            return Ok(());
        };
        let plain = decode_value(typed)?;
        self.last_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (self.collection.clone(), self.field.clone()),
                (plain, typed.clone()),
            );
        Ok(())
    }
}

/// Streaming state of one runQuery response body
struct QueryBody {
    chunks: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    splitter: ArraySplitter,
    pending: VecDeque<Vec<u8>>,
    exhausted: bool,
    ordering: Option<CursorKey>,
}

/// Yield the next document of the response, reading more of the body as needed
async fn next_document(mut body: QueryBody) -> Result<Option<(Document, QueryBody)>> {
    loop {
        while let Some(element) = body.pending.pop_front() {
            let response: RunQueryResponse = serde_json::from_slice(&element)?;
            if let Some(status) = response.error {
                return Err(status.into_error());
            }
            let Some(raw) = response.document else {
                continue;
            };
            if let Some(ordering) = &body.ordering {
                ordering.remember(&raw)?;
            }
            return Ok(Some((raw.into_document()?, body)));
        }

        if body.exhausted {
            body.splitter.finish()?;
            return Ok(None);
        }

        match body.chunks.next().await {
            Some(chunk) => {
                let chunk = chunk.map_err(Error::Http)?;
                let elements = body.splitter.push(&chunk)?;
                body.pending.extend(elements);
            }
            None => body.exhausted = true,
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn ordered_query(
        &self,
        collection: &str,
        field: &str,
        limit: usize,
        after: Option<&JsonValue>,
    ) -> Result<DocumentStream> {
        let mut query = json!({
            "from": [{ "collectionId": collection }],
            "orderBy": [{ "field": { "fieldPath": field }, "direction": "ASCENDING" }],
            "limit": limit,
        });
        if let Some(after) = after {
            query["startAt"] = json!({
                "values": [self.encode_cursor(collection, field, after)],
                "before": false,
            });
        }

        let ordering = CursorKey {
            last_keys: Arc::clone(&self.last_keys),
            collection: collection.to_string(),
            field: field.to_string(),
        };
        self.run_query(query, Some(ordering)).await
    }

    async fn unordered_query(&self, collection: &str) -> Result<DocumentStream> {
        let query = json!({ "from": [{ "collectionId": collection }] });
        self.run_query(query, None).await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut collections = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut body = json!({ "pageSize": LIST_COLLECTIONS_PAGE_SIZE });
            if let Some(token) = &page_token {
                body["pageToken"] = json!(token);
            }

            let page: ListCollectionIdsResponse =
                self.post("listCollectionIds", &body).await?.json().await.map_err(Error::Http)?;
            collections.extend(page.collection_ids);

            match page.next_page_token.none_if_empty() {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(collections)
    }
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("database_id", &self.database_id)
            .field("request_timeout", &self.request_timeout)
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}

/// Typed value at a dotted field path inside a document's `fields`
fn typed_field<'a>(fields: &'a JsonObject, path: &str) -> Option<&'a JsonValue> {
    let mut parts = path.split('.');
    let mut current = fields.get(parts.next()?)?;
    for part in parts {
        current = current.get("mapValue")?.get("fields")?.get(part)?;
    }
    Some(current)
}

/// One element of a runQuery response
#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    #[serde(default)]
    document: Option<RawDocument>,
    /// Set when the query failed after the response had started
    #[serde(default)]
    error: Option<RpcStatus>,
}

/// Error status embedded in a streamed response
#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

impl RpcStatus {
    fn into_error(self) -> Error {
        let unavailable = self.status == "UNAVAILABLE"
            || self.code == RPC_UNAVAILABLE
            || self.code == i32::from(StatusCode::SERVICE_UNAVAILABLE.as_u16());
        let message = format!("runQuery {} ({}): {}", self.status, self.code, self.message);
        if unavailable {
            Error::unavailable(message)
        } else {
            Error::store(message)
        }
    }
}

/// Document as returned by the REST API
#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: JsonObject,
}

impl RawDocument {
    fn into_document(self) -> Result<Document> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or(self.name.as_str())
            .to_string();
        Ok(Document::new(id, decode_fields(&self.fields)?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsResponse {
    #[serde(default)]
    collection_ids: Vec<String>,
    #[serde(default)]
    next_page_token: String,
}
