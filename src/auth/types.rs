//! Auth configuration types
//!
//! Service account keys as downloaded from the GCP console, and the runtime
//! auth configuration derived from them.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// OAuth2 scope granting read access to Firestore
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Google's default OAuth2 token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A GCP service account key file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    /// Key type, normally "service_account"
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,

    /// Project the account belongs to
    #[serde(default)]
    pub project_id: Option<String>,

    /// Service account email, used as the JWT issuer
    pub client_email: String,

    /// PEM-encoded RSA private key
    pub private_key: String,

    /// Token exchange endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Read a key file from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::auth(format!(
                "Failed to read service account file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse a key from its JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::auth(format!("Invalid service account JSON: {e}")))
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication (emulator)
    #[default]
    None,

    /// Static bearer token
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Service account JWT exchanged for an OAuth2 access token
    ServiceAccount {
        /// Issuer (service account email)
        client_email: String,
        /// PEM private key used for RS256 signing
        private_key: String,
        /// Token exchange endpoint
        token_uri: String,
        /// Requested scopes
        scopes: Vec<String>,
        /// Lifetime of the signed assertion
        token_lifetime_seconds: u64,
    },
}

impl AuthConfig {
    /// Build service account auth for Firestore from a key
    pub fn service_account(key: &ServiceAccountKey) -> Self {
        Self::ServiceAccount {
            client_email: key.client_email.clone(),
            private_key: key.private_key.clone(),
            token_uri: key.token_uri.clone(),
            scopes: vec![DATASTORE_SCOPE.to_string()],
            token_lifetime_seconds: 3600,
        }
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}
