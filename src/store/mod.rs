//! Document store module
//!
//! The capability the extractor reads from: ordered and bounded queries,
//! unbounded queries, and collection listing.
//!
//! # Implementations
//!
//! - `FirestoreStore` - Firestore REST API v1
//! - `MemoryStore` - in-process collections, records every query it serves

mod firestore;
mod json_array;
mod memory;
pub mod value;

pub use firestore::{FirestoreStore, DEFAULT_BASE_URL};
pub use memory::{MemoryStore, QueryKind, QueryRecord};

use crate::error::Result;
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A document: identifier plus field-value body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier, unique within the collection
    pub id: String,
    /// Field values
    pub body: JsonObject,
}

impl Document {
    /// Create a document
    pub fn new(id: impl Into<String>, body: JsonObject) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Create a document from a JSON value; non-objects yield an empty body
    pub fn from_value(id: impl Into<String>, value: JsonValue) -> Self {
        let body = match value {
            JsonValue::Object(map) => map,
            _ => JsonObject::new(),
        };
        Self::new(id, body)
    }

    /// Look up a field by dotted path (`address.city`)
    pub fn field(&self, path: &str) -> Option<&JsonValue> {
        let mut parts = path.split('.');
        let mut current = self.body.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

/// Stream of documents produced by a single query
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<Document>> + Send>>;

/// Read access to a hierarchical document store
///
/// Implementations are shared across collections and may be called
/// concurrently for different collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents ordered ascending by `field`, at most `limit` of them,
    /// strictly after `after` when given
    async fn ordered_query(
        &self,
        collection: &str,
        field: &str,
        limit: usize,
        after: Option<&JsonValue>,
    ) -> Result<DocumentStream>;

    /// Every document of the collection, in store order, no limit
    async fn unordered_query(&self, collection: &str) -> Result<DocumentStream>;

    /// Names of the root collections
    async fn list_collections(&self) -> Result<Vec<String>>;
}

/// Wrap an already materialised page as a stream
pub(crate) fn stream_of(documents: Vec<Document>) -> DocumentStream {
    Box::pin(futures::stream::iter(documents.into_iter().map(Ok)))
}
