//! Engine types
//!
//! Records, output messages and run statistics.

use crate::catalog::CatalogStream;
use crate::error::Result;
use crate::store::Document;
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A document as emitted downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Document id
    #[serde(rename = "_id")]
    pub id: String,
    /// Document body
    pub document: JsonObject,
}

impl From<Document> for Record {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            document: doc.body,
        }
    }
}

/// Lazy stream of records for one collection
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record>> + Send>>;

/// A message written to the output, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    /// Schema announcement, written before any record of the stream
    Schema {
        /// Stream name
        stream: String,
        /// JSON schema of the records
        schema: JsonValue,
        /// Primary key properties
        key_properties: Vec<String>,
    },
    /// One record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: Record,
        /// When the record was read
        time_extracted: DateTime<Utc>,
    },
}

impl Message {
    /// Create a schema message for a catalog stream
    pub fn schema(stream: &CatalogStream) -> Self {
        Self::Schema {
            stream: stream.stream.clone(),
            schema: stream.schema.clone(),
            key_properties: stream.key_properties.clone(),
        }
    }

    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: Record) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Utc::now(),
        }
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Serialize as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Statistics from a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records written
    pub records_synced: usize,
    /// Streams completed
    pub streams_synced: usize,
    /// Streams that failed
    pub streams_failed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a completed stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add a failed stream
    pub fn add_failure(&mut self) {
        self.streams_failed += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }

    /// Streams attempted
    pub fn total_streams(&self) -> usize {
        self.streams_synced + self.streams_failed
    }
}
