//! Configuration types for the tap
//!
//! The tap is configured by a single JSON (or YAML) document. Only
//! `service_account_path` is required; everything else has a default.

use crate::error::{Error, Result};
use crate::types::JsonObject;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of documents fetched per page
pub const DEFAULT_PAGINATION_LIMIT: usize = 10_000;

/// Default Firestore database id
pub const DEFAULT_DATABASE_ID: &str = "(default)";

// ============================================================================
// Top-Level Tap Config
// ============================================================================

/// Complete tap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Path to the GCP service account JSON key
    #[serde(default)]
    pub service_account_path: String,

    /// Project id (defaults to the service account's project)
    #[serde(default)]
    pub project_id: Option<String>,

    /// Firestore database id
    #[serde(default = "default_database_id")]
    pub database_id: String,

    /// Ordering fields used to page through collections
    #[serde(default)]
    pub pagination_fields: Vec<PaginationField>,

    /// Maximum number of documents fetched per page
    #[serde(default = "default_pagination_limit")]
    pub pagination_limit: usize,

    /// Override of the Firestore REST endpoint (emulator, tests)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Extra Firebase app options, logged but otherwise unused
    #[serde(default)]
    pub firebase_options: Option<JsonObject>,

    /// Earliest record date, accepted for compatibility
    #[serde(default)]
    pub start_date: Option<String>,

    /// Optional per-request timeout in seconds; unset means no limit
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_database_id() -> String {
    DEFAULT_DATABASE_ID.to_string()
}

fn default_pagination_limit() -> usize {
    DEFAULT_PAGINATION_LIMIT
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            service_account_path: String::new(),
            project_id: None,
            database_id: default_database_id(),
            pagination_fields: Vec::new(),
            pagination_limit: default_pagination_limit(),
            base_url: None,
            firebase_options: None,
            start_date: None,
            request_timeout_seconds: None,
        }
    }
}

impl TapConfig {
    /// Parse a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; `.yaml`/`.yml` files are parsed as YAML, anything else as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if is_yaml {
            let config: Self = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Self::from_json(&content)
        }
    }

    /// Check required fields and value ranges
    ///
    /// Duplicate pagination entries are deliberately left alone here: they
    /// fail only the affected collection, at extraction time.
    pub fn validate(&self) -> Result<()> {
        if self.service_account_path.trim().is_empty() {
            return Err(Error::missing_field("service_account_path"));
        }
        if self.pagination_limit == 0 {
            return Err(Error::invalid_value(
                "pagination_limit",
                "must be a positive integer",
            ));
        }
        for entry in &self.pagination_fields {
            if entry.collection.is_empty() || entry.field_name.is_empty() {
                return Err(Error::invalid_value(
                    "pagination_fields",
                    "entries need both `collection` and `field_name`",
                ));
            }
        }
        Ok(())
    }

    /// Add a pagination entry
    #[must_use]
    pub fn with_pagination_field(
        mut self,
        collection: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        self.pagination_fields
            .push(PaginationField::new(collection, field_name));
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_pagination_limit(mut self, limit: usize) -> Self {
        self.pagination_limit = limit;
        self
    }
}

// ============================================================================
// Pagination Fields
// ============================================================================

/// Ordering field configured for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationField {
    /// Collection name
    pub collection: String,

    /// Field to order and page by
    pub field_name: String,
}

impl PaginationField {
    /// Create a pagination entry
    pub fn new(collection: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field_name: field_name.into(),
        }
    }
}
