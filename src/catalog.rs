//! Stream catalog
//!
//! Every root collection becomes one stream. Documents have no fixed schema,
//! so each stream carries the same two-property schema: the document id
//! under `_id` and the document body under `document`.

use crate::error::{Error, Result};
use crate::store::DocumentStore;
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tracing::info;

/// Reserved key holding the document id in emitted records
pub const ID_KEY: &str = "_id";

/// Reserved key holding the document body in emitted records
pub const DOCUMENT_KEY: &str = "document";

/// Discovered catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Available streams
    pub streams: Vec<CatalogStream>,
}

/// One stream (collection) in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStream {
    /// Stream identifier (the collection name)
    pub tap_stream_id: String,

    /// Stream name
    pub stream: String,

    /// JSON schema for records
    #[serde(default = "document_schema")]
    pub schema: JsonValue,

    /// Primary key properties
    #[serde(default = "default_key_properties")]
    pub key_properties: Vec<String>,
}

fn default_key_properties() -> Vec<String> {
    vec![ID_KEY.to_string()]
}

impl CatalogStream {
    /// Stream for a collection
    pub fn for_collection(collection: impl Into<String>) -> Self {
        let name = collection.into();
        Self {
            tap_stream_id: name.clone(),
            stream: name,
            schema: document_schema(),
            key_properties: default_key_properties(),
        }
    }
}

/// Schema shared by every stream
pub fn document_schema() -> JsonValue {
    json!({
        "type": "object",
        "description": "The document from the Firestore collection",
        "properties": {
            ID_KEY: {
                "type": ["string", "null"],
                "description": "The document ID"
            },
            DOCUMENT_KEY: {
                "type": "object",
                "additionalProperties": true,
                "description": "The document from the Firestore collection"
            }
        }
    })
}

/// Build a catalog from the store's root collections
pub async fn discover(store: &dyn DocumentStore) -> Result<Catalog> {
    let collections = store.list_collections().await?;
    info!("Discovered {} collections", collections.len());

    Ok(Catalog {
        streams: collections
            .into_iter()
            .map(CatalogStream::for_collection)
            .collect(),
    })
}

impl Catalog {
    /// Parse a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalog file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Look up a stream by id
    pub fn stream(&self, name: &str) -> Option<&CatalogStream> {
        self.streams.iter().find(|s| s.tap_stream_id == name)
    }

    /// Stream ids in catalog order
    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.tap_stream_id.as_str()).collect()
    }

    /// Keep only the named streams, in the order given
    pub fn select(&self, names: &[String]) -> Result<Self> {
        let streams = names
            .iter()
            .map(|name| {
                self.stream(name)
                    .cloned()
                    .ok_or_else(|| Error::StreamNotFound {
                        stream: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { streams })
    }
}
