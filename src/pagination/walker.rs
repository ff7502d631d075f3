//! Cursor walker and unbounded fallback
//!
//! The walker pages through a collection ordered by one field, asking each
//! time for the documents strictly after the last value it has seen. Every
//! page is captured once; completeness and the next cursor are both derived
//! from that captured page.

use crate::error::{Error, Result};
use crate::store::{Document, DocumentStore, DocumentStream};
use crate::types::JsonValue;
use futures::{stream, TryStreamExt};
use std::sync::Arc;
use tracing::debug;

/// Where the next page starts
#[derive(Debug, Clone, PartialEq)]
pub enum PagePosition {
    /// Nothing fetched yet
    Start,
    /// Strictly after this ordering value
    After(JsonValue),
    /// Collection exhausted
    Done,
}

impl PagePosition {
    /// Position following a captured page
    ///
    /// A page shorter than `limit` is final. So is an empty page, or one
    /// whose last document lacks the ordering field.
    pub fn after_page(page: &[Document], field: &str, limit: usize) -> Self {
        if page.len() < limit {
            return Self::Done;
        }
        match page.last().and_then(|doc| doc.field(field)) {
            Some(value) => Self::After(value.clone()),
            None => Self::Done,
        }
    }

    /// Check if the walk is finished
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    fn lower_bound(&self) -> Option<&JsonValue> {
        match self {
            Self::After(value) => Some(value),
            _ => None,
        }
    }
}

/// State of one collection walk
struct WalkState {
    store: Arc<dyn DocumentStore>,
    collection: String,
    field: String,
    limit: usize,
    position: PagePosition,
    pages_fetched: usize,
}

/// Lazily page through `collection` ordered by `field`, `limit` documents at a time
///
/// Nothing is queried until the stream is polled. The stream is single-pass;
/// calling again starts a fresh walk from the beginning.
pub fn walk_collection(
    store: Arc<dyn DocumentStore>,
    collection: impl Into<String>,
    field: impl Into<String>,
    limit: usize,
) -> DocumentStream {
    let state = WalkState {
        store,
        collection: collection.into(),
        field: field.into(),
        limit,
        position: PagePosition::Start,
        pages_fetched: 0,
    };

    let pages = stream::try_unfold(state, next_page);

    Box::pin(
        pages
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<Document, Error>)))
            .try_flatten(),
    )
}

/// Fetch the page at the current position and advance past it
async fn next_page(mut state: WalkState) -> Result<Option<(Vec<Document>, WalkState)>> {
    if state.position.is_done() {
        return Ok(None);
    }

    let page: Vec<Document> = state
        .store
        .ordered_query(
            &state.collection,
            &state.field,
            state.limit,
            state.position.lower_bound(),
        )
        .await?
        .try_collect()
        .await?;

    state.pages_fetched += 1;
    state.position = PagePosition::after_page(&page, &state.field, state.limit);
    debug!(
        collection = %state.collection,
        page = state.pages_fetched,
        documents = page.len(),
        cursor = ?state.position,
        "Fetched page"
    );

    if page.is_empty() {
        return Ok(None);
    }
    Ok(Some((page, state)))
}

/// Lazily fetch the whole collection in one unbounded query
pub fn fetch_all(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> DocumentStream {
    let collection = collection.into();
    Box::pin(
        stream::once(async move {
            debug!(collection = %collection, "Fetching collection without pagination");
            store.unordered_query(&collection).await
        })
        .try_flatten(),
    )
}
