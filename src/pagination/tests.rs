//! Tests for pagination module

use super::*;
use crate::config::PaginationField;
use crate::error::{Error, Result};
use crate::store::{Document, DocumentStore, DocumentStream, MemoryStore, QueryKind};
use crate::types::JsonValue;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use test_case::test_case;

fn numbered(collection_size: usize) -> Vec<Document> {
    (1..=collection_size)
        .map(|n| Document::from_value(format!("doc{n:03}"), json!({ "n": n })))
        .collect()
}

fn store_with(docs: Vec<Document>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new().with_collection("orders", docs))
}

fn ordered_bounds(store: &MemoryStore) -> Vec<Option<JsonValue>> {
    store
        .queries()
        .into_iter()
        .map(|q| match q.kind {
            QueryKind::Ordered { after, .. } => after,
            QueryKind::Unordered => panic!("Expected only ordered queries"),
        })
        .collect()
}

async fn walk(store: &Arc<MemoryStore>, limit: usize) -> Vec<Document> {
    walk_collection(store.clone(), "orders", "n", limit)
        .try_collect()
        .await
        .unwrap()
}

fn values(docs: &[Document]) -> Vec<JsonValue> {
    docs.iter().map(|d| d.body["n"].clone()).collect()
}

// ============================================================================
// Resolver Tests
// ============================================================================

fn entries() -> Vec<PaginationField> {
    vec![
        PaginationField::new("orders", "created_at"),
        PaginationField::new("users", "email"),
    ]
}

#[test_case("orders", Some("created_at") ; "configured collection")]
#[test_case("users", Some("email") ; "second configured collection")]
#[test_case("products", None ; "unconfigured collection")]
fn test_resolve_unique_entries(collection: &str, expected: Option<&str>) {
    let fields = entries();
    assert_eq!(resolve_pagination_field(collection, &fields).unwrap(), expected);
}

#[test]
fn test_resolve_empty_config() {
    assert_eq!(resolve_pagination_field("orders", &[]).unwrap(), None);
}

#[test]
fn test_resolve_duplicate_entries_fail() {
    let mut fields = entries();
    fields.push(PaginationField::new("orders", "updated_at"));

    let err = resolve_pagination_field("orders", &fields).unwrap_err();
    match err {
        Error::Configuration { collection, .. } => assert_eq!(collection, "orders"),
        other => panic!("Expected Configuration error, got {other:?}"),
    }

    // Other collections are unaffected
    assert_eq!(
        resolve_pagination_field("users", &fields).unwrap(),
        Some("email")
    );
}

// ============================================================================
// PagePosition Tests
// ============================================================================

#[test]
fn test_position_short_page_is_final() {
    let page = numbered(1);
    assert!(PagePosition::after_page(&page, "n", 2).is_done());
}

#[test]
fn test_position_full_page_continues_from_last_value() {
    let page = numbered(2);
    assert_eq!(
        PagePosition::after_page(&page, "n", 2),
        PagePosition::After(json!(2))
    );
}

#[test]
fn test_position_empty_page_is_final() {
    assert!(PagePosition::after_page(&[], "n", 2).is_done());
}

#[test]
fn test_position_missing_cursor_field_is_final() {
    let page = vec![
        Document::from_value("a", json!({"n": 1})),
        Document::from_value("b", json!({"other": true})),
    ];
    assert!(PagePosition::after_page(&page, "n", 2).is_done());
}

// ============================================================================
// Walker Tests
// ============================================================================

#[tokio::test]
async fn test_walk_worked_example() {
    let store = store_with(numbered(5));

    let docs = walk(&store, 2).await;

    assert_eq!(values(&docs), vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);
    assert_eq!(ordered_bounds(&store), vec![None, Some(json!(2)), Some(json!(4))]);
}

#[tokio::test]
async fn test_walk_limit_plus_one() {
    let limit = 10;
    let store = store_with(numbered(limit + 1));

    let docs = walk(&store, limit).await;

    assert_eq!(docs.len(), limit + 1);
    let expected: Vec<JsonValue> = (1..=limit + 1).map(|n| json!(n)).collect();
    assert_eq!(values(&docs), expected);
    assert!(store.queries().len() >= 2);
}

#[tokio::test]
async fn test_walk_short_collection_single_query() {
    let store = store_with(numbered(3));

    let docs = walk(&store, 10).await;

    assert_eq!(docs.len(), 3);
    assert_eq!(store.queries().len(), 1);
}

#[tokio::test]
async fn test_walk_empty_collection() {
    let store = store_with(Vec::new());

    let docs = walk(&store, 10).await;

    assert!(docs.is_empty());
    assert_eq!(store.queries().len(), 1);
}

#[tokio::test]
async fn test_walk_exact_multiple_of_limit_ends_on_empty_page() {
    let store = store_with(numbered(4));

    let docs = walk(&store, 2).await;

    assert_eq!(docs.len(), 4);
    assert_eq!(ordered_bounds(&store), vec![None, Some(json!(2)), Some(json!(4))]);
}

#[tokio::test]
async fn test_walk_cursor_is_last_value_of_previous_page() {
    let docs: Vec<Document> = [5, 1, 9, 3, 7, 11, 2]
        .iter()
        .map(|n| Document::from_value(format!("id{n}"), json!({ "n": n })))
        .collect();
    let store = store_with(docs);

    let walked = walk(&store, 3).await;

    let walked_values = values(&walked);
    let bounds = ordered_bounds(&store);
    assert_eq!(bounds[0], None);
    for (i, bound) in bounds.iter().enumerate().skip(1) {
        assert_eq!(bound.as_ref(), Some(&walked_values[i * 3 - 1]));
    }
}

#[tokio::test]
async fn test_walk_pages_through_ordering_field_and_limit() {
    let store = store_with(numbered(3));
    walk(&store, 2).await;

    for query in store.queries() {
        match query.kind {
            QueryKind::Ordered { field, limit, .. } => {
                assert_eq!(field, "n");
                assert_eq!(limit, 2);
            }
            QueryKind::Unordered => panic!("Unexpected unordered query"),
        }
    }
}

#[tokio::test]
async fn test_walk_is_lazy() {
    let store = store_with(numbered(5));

    let mut stream = walk_collection(store.clone(), "orders", "n", 2);
    assert!(store.queries().is_empty());

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.id, "doc001");
    assert_eq!(store.queries().len(), 1);

    drop(stream);
    assert_eq!(store.queries().len(), 1);
}

#[tokio::test]
async fn test_walk_nested_ordering_field() {
    let docs = vec![
        Document::from_value("b", json!({"meta": {"rank": 2}})),
        Document::from_value("a", json!({"meta": {"rank": 1}})),
        Document::from_value("c", json!({"meta": {"rank": 3}})),
    ];
    let store = store_with(docs);

    let walked: Vec<Document> = walk_collection(store.clone(), "orders", "meta.rank", 2)
        .try_collect()
        .await
        .unwrap();

    let ids: Vec<&str> = walked.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

/// Serves one good page, then fails
struct FailsOnSecondPage {
    inner: MemoryStore,
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentStore for FailsOnSecondPage {
    async fn ordered_query(
        &self,
        collection: &str,
        field: &str,
        limit: usize,
        after: Option<&JsonValue>,
    ) -> Result<DocumentStream> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(Error::http_status(403, "denied"));
        }
        self.inner.ordered_query(collection, field, limit, after).await
    }

    async fn unordered_query(&self, collection: &str) -> Result<DocumentStream> {
        self.inner.unordered_query(collection).await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.inner.list_collections().await
    }
}

#[tokio::test]
async fn test_walk_propagates_store_errors() {
    let store = Arc::new(FailsOnSecondPage {
        inner: MemoryStore::new().with_collection("orders", numbered(4)),
        calls: AtomicUsize::new(0),
    });

    let results: Vec<Result<Document>> = walk_collection(store, "orders", "n", 2).collect().await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(Error::HttpStatus { status: 403, .. })));
}

// ============================================================================
// Fallback Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_all_single_unordered_query() {
    let store = store_with(numbered(25));

    let docs: Vec<Document> = fetch_all(store.clone(), "orders").try_collect().await.unwrap();

    assert_eq!(docs.len(), 25);
    let queries = store.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].kind, QueryKind::Unordered);
}

#[tokio::test]
async fn test_fetch_all_is_lazy() {
    let store = store_with(numbered(2));

    let stream = fetch_all(store.clone(), "orders");
    assert!(store.queries().is_empty());
    drop(stream);
    assert!(store.queries().is_empty());
}
