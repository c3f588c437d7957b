//! JWT signature verification against the identity provider's JWKS.
//!
//! # Security
//!
//! - Only RSA algorithms (RS256/384/512, PS256/384/512) are accepted
//! - The key is selected by the header `kid` from the cached key set; an
//!   unknown `kid` is a rejection, never a refetch
//! - `aud`, `iss` and `exp` are re-validated by the library with zero leeway
//! - Library errors are passed through as their kind name only, never with
//!   token or key material

use crate::auth::claims::VerifiedClaims;
use crate::auth::jwks::{Jwk, KeySource};
use crate::auth::policy::AuthPolicy;
use crate::errors::AuthError;
use common::jwt::TokenHeader;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::str::FromStr;
use std::sync::Arc;

/// Verifies token signatures with keys from a `KeySource`.
pub struct SignatureVerifier {
    keys: Arc<KeySource>,
}

impl SignatureVerifier {
    /// Create a verifier over a shared key source.
    pub fn new(keys: Arc<KeySource>) -> Self {
        Self { keys }
    }

    /// Key source backing this verifier.
    pub fn key_source(&self) -> &Arc<KeySource> {
        &self.keys
    }

    /// Verify the token's signature and standard claims.
    ///
    /// # Security Checks
    ///
    /// 1. Header `alg` present
    /// 2. Header `kid` names a key in the current snapshot
    /// 3. `alg` is an RSA algorithm and the JWK converts to an RSA decoding key
    /// 4. Signature verified; `aud`, `iss`, `exp` validated with no leeway
    ///
    /// # Errors
    ///
    /// - `MissingAlgorithm` - header has no `alg`
    /// - `KeyNotFound` - header has no `kid`, or it is not in the key set
    /// - `SignatureInvalid` - everything else, carrying the library's error kind
    pub fn verify(
        &self,
        token: &str,
        header: &TokenHeader,
        policy: &AuthPolicy,
    ) -> Result<VerifiedClaims, AuthError> {
        let Some(alg) = header.alg.as_deref() else {
            tracing::debug!(target: "chat.auth.jwt", "Token header has no alg");
            return Err(AuthError::MissingAlgorithm);
        };

        let jwk = header
            .kid
            .as_deref()
            .and_then(|kid| self.keys.find_by_key_id(kid))
            .ok_or_else(|| {
                tracing::debug!(
                    target: "chat.auth.jwt",
                    kid = header.kid.as_deref().unwrap_or("<none>"),
                    "Signing key not found in JWKS"
                );
                AuthError::KeyNotFound
            })?;

        let algorithm = parse_algorithm(alg)?;
        let decoding_key = decoding_key(&jwk)?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_audience(&[policy.audience.as_str()]);
        validation.set_issuer(&[policy.issuer.as_str()]);

        let token_data = decode::<VerifiedClaims>(token, &decoding_key, &validation).map_err(|e| {
            let reason = rejection_reason(&e);
            tracing::debug!(target: "chat.auth.jwt", reason = %reason, "Token verification failed");
            AuthError::SignatureInvalid(reason)
        })?;

        tracing::debug!(target: "chat.auth.jwt", kid = %jwk.kid, "Token signature verified");
        Ok(token_data.claims)
    }
}

/// Reason reported for a library failure.
///
/// JSON errors quote claim values, so only their kind is reported.
fn rejection_reason(error: &jsonwebtoken::errors::Error) -> String {
    match error.kind() {
        ErrorKind::Json(_) => "InvalidClaimFormat".to_string(),
        _ => error.to_string(),
    }
}

/// Parse the header `alg`, accepting only RSA signature algorithms.
fn parse_algorithm(alg: &str) -> Result<Algorithm, AuthError> {
    let algorithm = Algorithm::from_str(alg).map_err(|e| {
        tracing::debug!(target: "chat.auth.jwt", alg = %alg, "Unknown token algorithm");
        AuthError::SignatureInvalid(e.to_string())
    })?;

    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Ok(algorithm),
        _ => {
            tracing::warn!(target: "chat.auth.jwt", alg = %alg, "Rejected non-RSA token algorithm");
            Err(AuthError::SignatureInvalid(
                jsonwebtoken::errors::Error::from(ErrorKind::InvalidAlgorithm).to_string(),
            ))
        }
    }
}

/// Build an RSA decoding key from a JWK.
fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    let invalid_key = || {
        AuthError::SignatureInvalid(jsonwebtoken::errors::Error::from(ErrorKind::InvalidKeyFormat).to_string())
    };

    if jwk.kty != "RSA" {
        tracing::warn!(target: "chat.auth.jwt", kid = %jwk.kid, kty = %jwk.kty, "Unexpected JWK key type");
        return Err(invalid_key());
    }

    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        tracing::error!(target: "chat.auth.jwt", kid = %jwk.kid, "JWK missing RSA components");
        return Err(invalid_key());
    };

    DecodingKey::from_rsa_components(n, e).map_err(|err| {
        tracing::error!(target: "chat.auth.jwt", kid = %jwk.kid, error = %err, "Invalid RSA key encoding");
        AuthError::SignatureInvalid(err.to_string())
    })
}
