//! Authenticator implementation
//!
//! Handles applying authentication to requests and managing token refresh.

use super::types::{AuthConfig, CachedToken};
use crate::error::{Error, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached access token for service account auth
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),
            AuthConfig::Bearer { token } => Ok(req.bearer_auth(token)),
            AuthConfig::ServiceAccount { .. } => {
                let token = self.get_or_refresh_token().await?;
                Ok(req.bearer_auth(token))
            }
        }
    }

    /// Get a valid token, refreshing if necessary
    async fn get_or_refresh_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_new_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Fetch a new token based on auth type
    async fn fetch_new_token(&self) -> Result<CachedToken> {
        match &self.config {
            AuthConfig::ServiceAccount {
                client_email,
                private_key,
                token_uri,
                scopes,
                token_lifetime_seconds,
            } => {
                let assertion =
                    sign_assertion(client_email, private_key, token_uri, scopes, *token_lifetime_seconds)?;
                self.exchange_assertion(token_uri, &assertion).await
            }
            _ => Err(Error::auth(
                "Token refresh not supported for this auth type",
            )),
        }
    }

    /// Exchange a signed assertion for an access token (JWT bearer grant)
    async fn exchange_assertion(&self, token_uri: &str, assertion: &str) -> Result<CachedToken> {
        debug!("Exchanging service account assertion at {token_uri}");

        let form = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion),
        ];

        let response = self
            .http_client
            .post(token_uri)
            .form(&form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token exchange failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        Ok(token_response.into_cached_token())
    }

    /// Clear the cached token
    pub async fn clear_cache(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.config {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ServiceAccount { .. } => "service_account",
        };
        f.debug_struct("Authenticator")
            .field("mode", &mode)
            .finish_non_exhaustive()
    }
}

/// Sign an RS256 assertion for the service account
pub(crate) fn sign_assertion(
    client_email: &str,
    private_key: &str,
    audience: &str,
    scopes: &[String],
    lifetime_seconds: u64,
) -> Result<String> {
    let now = Utc::now().timestamp();
    #[allow(clippy::cast_possible_wrap)]
    let exp = now + lifetime_seconds as i64;

    let claims = JwtClaims {
        iss: client_email.to_string(),
        scope: scopes.join(" "),
        aud: audience.to_string(),
        iat: now,
        exp,
    };

    let encoding_key =
        EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| Error::JwtGeneration {
            message: format!("Invalid private key: {e}"),
        })?;

    encode(&Header::new(Algorithm::RS256), &claims, &encoding_key).map_err(|e| {
        Error::JwtGeneration {
            message: format!("Failed to encode JWT: {e}"),
        }
    })
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        }
    }
}

/// JWT claims for the Google JWT bearer grant
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JwtClaims {
    pub(crate) iss: String,
    pub(crate) scope: String,
    pub(crate) aud: String,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}
