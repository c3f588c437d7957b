//! JWKS client and key snapshot for the identity provider's signing keys.
//!
//! `JwksClient` fetches the JSON Web Key Set from the provider's discovery
//! endpoint. `KeySource` holds the fetched set as an immutable snapshot that
//! request handlers read without any I/O.
//!
//! # Lifecycle
//!
//! - Startup loads the first snapshot and refuses to serve if that fails
//! - The request path only ever reads the current snapshot
//! - An optional background task (see `tasks::jwks_refresh`) may replace the
//!   snapshot; a failed refresh leaves the previous snapshot in place

use crate::errors::AuthError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::instrument;

/// Default timeout for the JWKS request in seconds.
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// JSON Web Key from the JWKS endpoint.
///
/// Only RSA material is modelled. Other members published by the provider
/// (`nbf`, `x5c`, `x5t`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for the provider's signing keys).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm hint (e.g. "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS response body.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// A validated key set, keyed uniquely by `kid`.
#[derive(Debug, Clone, Default)]
pub struct JwkSet {
    keys: HashMap<String, Arc<Jwk>>,
}

impl JwkSet {
    /// Build a key set, rejecting duplicate key IDs.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DiscoveryUnavailable` if two keys share a `kid`.
    pub fn from_keys(keys: Vec<Jwk>) -> Result<Self, AuthError> {
        let mut map = HashMap::with_capacity(keys.len());
        for key in keys {
            let kid = key.kid.clone();
            if map.insert(kid.clone(), Arc::new(key)).is_some() {
                tracing::error!(target: "chat.auth.jwks", kid = %kid, "Duplicate kid in JWKS");
                return Err(AuthError::DiscoveryUnavailable(format!(
                    "duplicate key id '{kid}' in JWKS"
                )));
            }
        }
        Ok(Self { keys: map })
    }

    /// Look up a key by ID.
    pub fn get(&self, kid: &str) -> Option<Arc<Jwk>> {
        self.keys.get(kid).cloned()
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl TryFrom<JwksResponse> for JwkSet {
    type Error = AuthError;

    fn try_from(response: JwksResponse) -> Result<Self, Self::Error> {
        Self::from_keys(response.keys)
    }
}

/// HTTP client for the provider's JWKS discovery endpoint.
#[derive(Clone)]
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
}

impl JwksClient {
    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the provider's JWKS endpoint
    pub fn new(jwks_url: String) -> Self {
        Self::with_timeout(jwks_url, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS))
    }

    /// Create a new JWKS client with a custom request timeout.
    pub fn with_timeout(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "chat.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }

    /// URL this client fetches from.
    pub fn url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch and validate the key set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DiscoveryUnavailable` if the request fails, the
    /// endpoint returns a non-success status, the body is not a JWKS, the set
    /// is empty, or it contains duplicate key IDs.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn fetch(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(target: "chat.auth.jwks", "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "chat.auth.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::DiscoveryUnavailable("JWKS request failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "chat.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(AuthError::DiscoveryUnavailable(format!(
                "JWKS endpoint returned {status}"
            )));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "chat.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::DiscoveryUnavailable("JWKS response is not a valid key set".to_string())
        })?;

        let set = JwkSet::try_from(jwks)?;
        if set.is_empty() {
            tracing::error!(target: "chat.auth.jwks", "JWKS contains no keys");
            return Err(AuthError::DiscoveryUnavailable(
                "JWKS contains no keys".to_string(),
            ));
        }

        tracing::info!(target: "chat.auth.jwks", key_count = set.len(), "JWKS fetched");

        Ok(set)
    }
}

/// Read-only view of the provider's current signing keys.
///
/// Constructed once at startup and shared behind an `Arc`. Readers clone the
/// inner `Arc<JwkSet>` under a short read lock; replacing the snapshot never
/// mutates a set a reader already holds.
pub struct KeySource {
    snapshot: RwLock<Arc<JwkSet>>,
}

impl KeySource {
    /// Wrap an already-fetched key set.
    pub fn new(keys: JwkSet) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(keys)),
        }
    }

    /// Perform the initial fetch.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DiscoveryUnavailable` if the keys cannot be
    /// fetched or the set is empty. Callers treat this as fatal at startup.
    pub async fn load(client: &JwksClient) -> Result<Self, AuthError> {
        let keys = client.fetch().await?;
        Ok(Self::new(keys))
    }

    /// Look up a signing key by key ID. Never performs I/O.
    pub fn find_by_key_id(&self, kid: &str) -> Option<Arc<Jwk>> {
        self.snapshot().get(kid)
    }

    /// Current key set.
    pub fn snapshot(&self) -> Arc<JwkSet> {
        // A panicking writer can only have been replacing the Arc; the old
        // value is still a complete snapshot.
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Atomically replace the key set.
    pub fn replace(&self, keys: JwkSet) {
        let keys = Arc::new(keys);
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = keys;
    }

    /// Number of keys in the current snapshot.
    pub fn key_count(&self) -> usize {
        self.snapshot().len()
    }
}
