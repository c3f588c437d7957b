//! Single entry point that turns an `Authorization` header into a decision.
//!
//! Steps, each able to reject:
//!
//! 1. Header split into exactly two whitespace-separated parts
//! 2. Token parsed without verification
//! 3. Policy checks on the unverified claims
//! 4. Signature verification
//!
//! Cheap checks always precede cryptography. Validation is synchronous and
//! performs no I/O.

use crate::auth::claims::VerifiedClaims;
use crate::auth::jwks::KeySource;
use crate::auth::jwt::SignatureVerifier;
use crate::auth::policy::{self, AuthPolicy};
use crate::errors::AuthError;
use crate::observability::metrics;
use common::jwt::parse_unverified;
use std::sync::Arc;

/// Validates bearer credentials against the policy and the key set.
pub struct AuthGate {
    policy: AuthPolicy,
    verifier: SignatureVerifier,
}

impl AuthGate {
    pub fn new(policy: AuthPolicy, keys: Arc<KeySource>) -> Self {
        Self {
            policy,
            verifier: SignatureVerifier::new(keys),
        }
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    /// Validate a raw `Authorization` header value at the current time.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` of the first failing step.
    pub fn validate(&self, authorization: Option<&str>) -> Result<VerifiedClaims, AuthError> {
        self.validate_at(authorization, chrono::Utc::now().timestamp())
    }

    /// Validate with an explicit `now` (Unix seconds) for the policy step.
    ///
    /// The signature step re-checks `exp` against the system clock.
    pub fn validate_at(
        &self,
        authorization: Option<&str>,
        now: i64,
    ) -> Result<VerifiedClaims, AuthError> {
        let result = self.run(authorization, now);

        match &result {
            Ok(_) => {
                tracing::debug!(target: "chat.auth.gate", "Token accepted");
                metrics::record_auth_decision("accepted", "none");
            }
            Err(e) => {
                tracing::info!(target: "chat.auth.gate", reason = e.code(), "Token rejected");
                metrics::record_auth_decision("rejected", e.code());
            }
        }

        result
    }

    fn run(&self, authorization: Option<&str>, now: i64) -> Result<VerifiedClaims, AuthError> {
        let token = extract_bearer_token(authorization)?;
        let (header, claims) = parse_unverified(token)?;
        policy::check(&claims, &self.policy, now)?;
        self.verifier.verify(token, &header, &self.policy)
    }
}

/// Extract the credential from an `Authorization` header value.
///
/// The value must split into exactly two whitespace-separated parts. The
/// first part (the scheme) is not inspected.
///
/// # Errors
///
/// - `MissingHeader` - header absent or empty
/// - `MalformedHeader` - any other number of parts
pub fn extract_bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let header = match authorization {
        Some(h) if !h.is_empty() => h,
        _ => return Err(AuthError::MissingHeader),
    };

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_scheme), Some(token), None) => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::JwkSet;
    use crate::auth::policy::AllowList;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn gate() -> AuthGate {
        AuthGate::new(
            AuthPolicy {
                issuer: "issuer".to_string(),
                audience: "audience".to_string(),
                scope: "Chat.chat".to_string(),
                allowed_emails: AllowList::new(["allowed@x.com"]),
            },
            Arc::new(KeySource::new(JwkSet::default())),
        )
    }

    fn unsigned_token(header: &serde_json::Value, payload: &serde_json::Value) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    fn good_payload() -> serde_json::Value {
        json!({
            "iss": "issuer",
            "aud": "audience",
            "scp": "Chat.chat",
            "exp": NOW + 60,
            "emails": ["allowed@x.com"]
        })
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer_token(Some("  Bearer   tok  ")), Ok("tok"));
    }

    #[test]
    fn test_missing_or_empty_header() {
        assert_eq!(extract_bearer_token(None), Err(AuthError::MissingHeader));
        assert_eq!(extract_bearer_token(Some("")), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_wrong_part_count() {
        assert_eq!(extract_bearer_token(Some("Bearer")), Err(AuthError::MalformedHeader));
        assert_eq!(extract_bearer_token(Some("   ")), Err(AuthError::MalformedHeader));
        assert_eq!(
            extract_bearer_token(Some("Bearer a b")),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn test_scheme_word_not_checked() {
        assert_eq!(extract_bearer_token(Some("Basic abc")), Ok("abc"));
        assert_eq!(gate().validate_at(Some("Basic abc"), NOW), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_policy_runs_before_key_lookup() {
        let mut payload = good_payload();
        payload["iss"] = json!("wrong");
        let token = unsigned_token(&json!({"alg": "RS256", "kid": "missing"}), &payload);

        let result = gate().validate_at(Some(&format!("Bearer {token}")), NOW);
        assert_eq!(result.unwrap_err(), AuthError::IssuerMismatch);
    }

    #[test]
    fn test_expiry_uses_injected_now() {
        let token = unsigned_token(&json!({"alg": "RS256", "kid": "k"}), &good_payload());
        let header = format!("Bearer {token}");

        let result = gate().validate_at(Some(&header), NOW + 61);
        assert_eq!(result.unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn test_missing_alg_after_policy() {
        let token = unsigned_token(&json!({"kid": "k"}), &good_payload());

        let result = gate().validate_at(Some(&format!("Bearer {token}")), NOW);
        assert_eq!(result.unwrap_err(), AuthError::MissingAlgorithm);
    }

    #[test]
    fn test_unknown_kid_after_policy() {
        let token = unsigned_token(&json!({"alg": "RS256", "kid": "k"}), &good_payload());

        let result = gate().validate_at(Some(&format!("Bearer {token}")), NOW);
        assert_eq!(result.unwrap_err(), AuthError::KeyNotFound);
    }
}
