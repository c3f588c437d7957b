//! Builder for test token claims
//!
//! Defaults produce claims that pass the test server's policy: issuer,
//! audience, scope, one-hour expiry and an allowlisted `emails` entry.

use crate::crypto_fixtures::{FixtureError, TestKeypair};
use crate::test_ids::{ALLOWED_EMAIL, TEST_AUDIENCE, TEST_ISSUER, TEST_SCOPE, TEST_SUBJECT};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .emails(&["alice@example.com"])
///     .expires_in(60)
///     .sign_with(&TestKeypair::primary())?;
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with valid defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("aud".to_string(), json!(TEST_AUDIENCE));
        claims.insert("scp".to_string(), json!(TEST_SCOPE));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert("sub".to_string(), json!(TEST_SUBJECT));
        claims.insert("emails".to_string(), json!([ALLOWED_EMAIL]));
        Self { claims }
    }

    /// Set the issuer
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Set the audience
    pub fn audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    /// Set the scope string
    pub fn scope(self, scope: &str) -> Self {
        self.claim("scp", json!(scope))
    }

    /// Set the single `email` claim
    pub fn email(self, email: &str) -> Self {
        self.claim("email", json!(email))
    }

    /// Set the `emails` array claim
    pub fn emails(self, emails: &[&str]) -> Self {
        self.claim("emails", json!(emails))
    }

    /// Set the expiration timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.claim("exp", json!(timestamp))
    }

    /// Set expiration in seconds from now (negative for expired tokens)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.expires_at((Utc::now() + Duration::seconds(seconds)).timestamp())
    }

    /// Set or replace an arbitrary claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Build and sign with RS256 under the keypair's `kid`
    pub fn sign_with(self, keypair: &TestKeypair) -> Result<String, FixtureError> {
        keypair.sign_claims(&self.build())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let claims = TestTokenBuilder::new().build();

        assert_eq!(claims["iss"], TEST_ISSUER);
        assert_eq!(claims["aud"], TEST_AUDIENCE);
        assert_eq!(claims["scp"], TEST_SCOPE);
        assert_eq!(claims["emails"], json!([ALLOWED_EMAIL]));
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_overrides_and_removals() {
        let claims = TestTokenBuilder::default()
            .issuer("other")
            .without("scp")
            .email("x@example.com")
            .expires_at(42)
            .build();

        assert_eq!(claims["iss"], "other");
        assert!(claims.get("scp").is_none());
        assert_eq!(claims["email"], "x@example.com");
        assert_eq!(claims["exp"], 42);
    }
}
