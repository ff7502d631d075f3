//! In-memory document store
//!
//! Orders values the way Firestore does and keeps a log of every query it
//! serves, which makes paging behaviour observable.

use super::{stream_of, Document, DocumentStore, DocumentStream};
use crate::error::Result;
use crate::types::JsonValue;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock};

/// Kind of query served by a `MemoryStore`
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    /// Bounded query ordered by a field
    Ordered {
        /// Ordering field
        field: String,
        /// Page size
        limit: usize,
        /// Exclusive lower bound
        after: Option<JsonValue>,
    },
    /// Whole-collection query
    Unordered,
}

/// One query served by a `MemoryStore`
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    /// Collection queried
    pub collection: String,
    /// Query shape
    pub kind: QueryKind,
}

/// Collections held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
    log: Mutex<Vec<QueryRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection
    #[must_use]
    pub fn with_collection(self, name: impl Into<String>, documents: Vec<Document>) -> Self {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), documents);
        self
    }

    /// Append a document to a collection, creating it if needed
    pub fn insert(&self, collection: &str, document: Document) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Queries served so far, oldest first
    pub fn queries(&self) -> Vec<QueryRecord> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the query log
    pub fn clear_log(&self) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, collection: &str, kind: QueryKind) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(QueryRecord {
                collection: collection.to_string(),
                kind,
            });
    }

    fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ordered_query(
        &self,
        collection: &str,
        field: &str,
        limit: usize,
        after: Option<&JsonValue>,
    ) -> Result<DocumentStream> {
        self.record(
            collection,
            QueryKind::Ordered {
                field: field.to_string(),
                limit,
                after: after.cloned(),
            },
        );

        // Documents without the field never appear in an ordered query
        let mut keyed: Vec<(JsonValue, Document)> = self
            .documents(collection)
            .into_iter()
            .filter_map(|doc| doc.field(field).cloned().map(|key| (key, doc)))
            .filter(|(key, _)| after.map_or(true, |a| compare_values(key, a) == Ordering::Greater))
            .collect();

        keyed.sort_by(|(ka, da), (kb, db)| compare_values(ka, kb).then_with(|| da.id.cmp(&db.id)));

        let page = keyed.into_iter().take(limit).map(|(_, doc)| doc).collect();
        Ok(stream_of(page))
    }

    async fn unordered_query(&self, collection: &str) -> Result<DocumentStream> {
        self.record(collection, QueryKind::Unordered);
        Ok(stream_of(self.documents(collection)))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }
}

/// Firestore's cross-type ordering: null < bool < number < string < array < map
fn type_rank(value: &JsonValue) -> u8 {
    match value {
        JsonValue::Null => 0,
        JsonValue::Bool(_) => 1,
        JsonValue::Number(_) => 2,
        JsonValue::String(_) => 3,
        JsonValue::Array(_) => 4,
        JsonValue::Object(_) => 5,
    }
}

/// Total order over JSON values
pub(crate) fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(i), Some(j)) => i.cmp(&j),
                _ => {
                    let fx = x.as_f64().unwrap_or(f64::NAN);
                    let fy = y.as_f64().unwrap_or(f64::NAN);
                    fx.total_cmp(&fy)
                }
            }
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            for ((kl, vl), (kr, vr)) in x.iter().zip(y) {
                let ord = kl.cmp(kr).then_with(|| compare_values(vl, vr));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
