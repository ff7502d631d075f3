//! Authentication module
//!
//! Supports: no auth (emulator), static bearer token, service account JWT.
//!
//! The `Authenticator` applies credentials to outgoing requests and caches
//! exchanged access tokens until shortly before they expire.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken, ServiceAccountKey, DATASTORE_SCOPE, DEFAULT_TOKEN_URI};

#[cfg(test)]
mod tests;
