// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-firestore
//!
//! Extracts every document of every root collection in a Firestore database
//! and writes them as JSON-line messages.
//!
//! ## Features
//!
//! - **Value-cursor pagination**: collections with a configured ordering
//!   field are read `pagination_limit` documents at a time, each page
//!   starting strictly after the last value of the previous one
//! - **Unbounded fallback**: collections without a field are read in one query
//! - **Transient-fault retry**: an unavailable store restarts the collection
//!   walk, up to three attempts
//! - **Service account auth**: RS256 JWT exchanged for an access token
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use futures::TryStreamExt;
//! use tap_firestore::{engine::extract_records, retry::RetryPolicy, store::FirestoreStore, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> tap_firestore::Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let store = Arc::new(FirestoreStore::from_config(&config)?);
//!
//!     let mut records = extract_records(store, "orders", &config, RetryPolicy::default())?;
//!     while let Some(record) = records.try_next().await? {
//!         println!("{}", record.id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │           CLI: check · discover · read                          │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────────────┴───────┬──────────┬───────────────┐
//! │ Catalog  │         Engine            │  Retry   │   Pagination  │
//! ├──────────┼───────────────────────────┼──────────┼───────────────┤
//! │ discover │ extract_records           │ restart  │ resolver      │
//! │ select   │ SyncEngine → JSON lines   │ backoff  │ walker        │
//! │          │                           │          │ fallback      │
//! └──────────┴───────────────────────────┴──────────┴───────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ DocumentStore: FirestoreStore (REST v1 + auth) · MemoryStore    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// Service account authentication
pub mod auth;

/// Document store capability and implementations
pub mod store;

/// Pagination field resolution and collection walking
pub mod pagination;

/// Transient-fault retry
pub mod retry;

/// Stream catalog and discovery
pub mod catalog;

/// Main execution engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{PaginationField, TapConfig};
pub use store::{Document, DocumentStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
