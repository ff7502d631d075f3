//! Execution engine module
//!
//! Ties the pieces together for one collection: resolve the ordering field,
//! walk or fetch the collection, and rebuild the walk on transient faults.
//! `SyncEngine` runs that for every stream in a catalog and writes the
//! resulting messages.

mod types;

pub use types::{Message, Record, RecordStream, SyncStats};

use crate::catalog::{Catalog, CatalogStream};
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::pagination::{fetch_all, resolve_pagination_field, walk_collection};
use crate::retry::{retry_stream, RetryPolicy};
use crate::store::DocumentStore;
use futures::TryStreamExt;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Lazily extract every document of `collection` as records
///
/// The ordering field is resolved here, before any query is issued, so a
/// configuration error surfaces without touching the store. With a field the
/// collection is paged through `pagination_limit` documents at a time;
/// without one it is read in a single unbounded query. A transient store
/// fault restarts the whole extraction, so records already yielded may be
/// yielded again.
pub fn extract_records(
    store: Arc<dyn DocumentStore>,
    collection: &str,
    config: &TapConfig,
    retry: RetryPolicy,
) -> Result<RecordStream> {
    let field = resolve_pagination_field(collection, &config.pagination_fields)?.map(str::to_string);
    let limit = config.pagination_limit;

    match &field {
        Some(field) => info!(
            "Paginating collection '{}' by '{}' with limit {}",
            collection, field, limit
        ),
        None => info!(
            "No pagination field for collection '{}', reading it in one query",
            collection
        ),
    }

    let name = collection.to_string();
    let documents = retry_stream(retry, collection, move || match &field {
        Some(field) => walk_collection(store.clone(), name.clone(), field.clone(), limit),
        None => fetch_all(store.clone(), name.clone()),
    });

    Ok(Box::pin(documents.map_ok(Record::from)))
}

/// Sync engine for running a catalog against a store
pub struct SyncEngine {
    /// Document store
    store: Arc<dyn DocumentStore>,
    /// Tap configuration
    config: TapConfig,
    /// Retry policy per stream
    retry: RetryPolicy,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(store: Arc<dyn DocumentStore>, config: TapConfig) -> Self {
        Self {
            store,
            config,
            retry: RetryPolicy::default(),
            stats: SyncStats::default(),
        }
    }

    /// Set retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync every stream in the catalog, writing messages to `out`
    ///
    /// Streams are independent: one failing is logged and counted, and the
    /// remaining streams still run. The run fails afterwards if any stream
    /// failed. Write errors abort immediately.
    pub async fn sync<W: Write>(&mut self, catalog: &Catalog, out: &mut W) -> Result<SyncStats> {
        let start = Instant::now();
        self.stats = SyncStats::new();

        for stream in &catalog.streams {
            match self.sync_stream(stream, out).await {
                Ok(count) => {
                    info!(
                        "Completed sync for {}: {} records",
                        stream.tap_stream_id, count
                    );
                    self.stats.add_stream();
                }
                Err(err @ Error::Io(_)) => return Err(err),
                Err(err) => {
                    error!("Sync failed for {}: {}", stream.tap_stream_id, err);
                    self.stats.add_failure();
                }
            }
        }

        out.flush()?;
        self.stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Sync finished: {} streams, {} failed, {} records in {}ms",
            self.stats.total_streams(),
            self.stats.streams_failed,
            self.stats.records_synced,
            self.stats.duration_ms
        );

        if self.stats.streams_failed > 0 {
            return Err(Error::SyncFailed {
                failed: self.stats.streams_failed,
                total: self.stats.total_streams(),
            });
        }
        Ok(self.stats.clone())
    }

    /// Sync a single stream, returning the number of records written
    pub async fn sync_stream<W: Write>(&mut self, stream: &CatalogStream, out: &mut W) -> Result<usize> {
        let mut records = extract_records(
            self.store.clone(),
            &stream.tap_stream_id,
            &self.config,
            self.retry.clone(),
        )?;

        write_message(out, &Message::schema(stream))?;

        let mut count = 0;
        while let Some(record) = records.try_next().await? {
            write_message(out, &Message::record(&stream.stream, record))?;
            count += 1;
            self.stats.add_records(1);
        }
        Ok(count)
    }
}

/// Write one message as a JSON line
pub fn write_message<W: Write>(out: &mut W, message: &Message) -> Result<()> {
    writeln!(out, "{}", message.to_json_line()?)?;
    Ok(())
}
