//! JWT structural parsing shared across chat services.
//!
//! This module splits a compact token into its header and payload without
//! touching the signature. Everything it returns is UNVERIFIED: the values
//! are only suitable for cheap pre-checks and key selection, and the token
//! MUST still go through signature verification before any claim is trusted.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Unknown header fields and claims are ignored, never rejected
//! - Claim values are kept as raw JSON so a wrongly typed claim surfaces as a
//!   policy rejection instead of a parse failure
//! - Error messages are generic; details are logged at debug level
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::parse_unverified;
//!
//! let (header, claims) = parse_unverified(token)?;
//! if claims.iss.is_none() {
//!     // reject before paying for a key lookup
//! }
//! ```

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity provider tokens are typically 1-2KB (RSA signature plus profile
/// claims). Anything above 8KB is rejected before any base64 decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing an unverified JWT.
///
/// Both variants share one client-facing message; the distinction is kept for
/// logging and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("Malformed token")]
    TokenTooLarge,

    /// Token is not three base64url JSON segments.
    #[error("Malformed token")]
    MalformedToken,
}

// =============================================================================
// Unverified Token Parts
// =============================================================================

/// JOSE header of a token, read without verification.
///
/// `alg` and `kid` are `None` when absent or not JSON strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signing algorithm name (e.g. "RS256").
    pub alg: Option<String>,

    /// Key ID referencing an entry in the issuer's JWKS.
    pub kid: Option<String>,

    /// Token type, usually "JWT".
    pub typ: Option<String>,
}

impl TokenHeader {
    fn from_map(map: &Map<String, Value>) -> Self {
        let string_field = |name: &str| map.get(name).and_then(Value::as_str).map(String::from);
        Self {
            alg: string_field("alg"),
            kid: string_field("kid"),
            typ: string_field("typ"),
        }
    }
}

/// Token claims read WITHOUT signature verification.
///
/// Only the claims consulted by the authorization policy are extracted.
/// Each one is optional and holds the raw JSON value found in the payload.
/// Identity claims are redacted in Debug output.
#[derive(Clone, Default, PartialEq)]
pub struct UnverifiedClaims {
    /// Issuer.
    pub iss: Option<Value>,

    /// Audience.
    pub aud: Option<Value>,

    /// Space-delimited scope string.
    pub scp: Option<Value>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: Option<Value>,

    /// Single email identity.
    pub email: Option<Value>,

    /// Ordered email identities, as issued by B2C user flows.
    pub emails: Option<Value>,
}

impl UnverifiedClaims {
    fn from_map(mut map: Map<String, Value>) -> Self {
        Self {
            iss: map.remove("iss"),
            aud: map.remove("aud"),
            scp: map.remove("scp"),
            exp: map.remove("exp"),
            email: map.remove("email"),
            emails: map.remove("emails"),
        }
    }
}

impl fmt::Debug for UnverifiedClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnverifiedClaims")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("scp", &self.scp)
            .field("exp", &self.exp)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("emails", &self.emails.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Parse a compact JWT into its header and claims without verifying it.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the signature
/// - The returned values are untrusted input
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Token does not have exactly two `.` separators, or
///   the header or payload is not base64url-encoded JSON object
pub fn parse_unverified(token: &str) -> Result<(TokenHeader, UnverifiedClaims), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header_part), Some(payload_part), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(
            target: "common.jwt",
            separators = token.matches('.').count(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    };

    let header = decode_segment(header_part, "header")?;
    let payload = decode_segment(payload_part, "payload")?;

    Ok((
        TokenHeader::from_map(&header),
        UnverifiedClaims::from_map(payload),
    ))
}

/// Decode one base64url segment into a JSON object.
///
/// Unpadded base64url is canonical for JWTs; padded input is tolerated.
fn decode_segment(segment: &str, name: &str) -> Result<Map<String, Value>, JwtValidationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| URL_SAFE.decode(segment))
        .map_err(|e| {
            tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode JWT segment base64");
            JwtValidationError::MalformedToken
        })?;

    serde_json::from_slice::<Map<String, Value>>(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to parse JWT segment JSON");
        JwtValidationError::MalformedToken
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    fn token(header: &Value, payload: &Value) -> String {
        format!("{}.{}.signature", encode(header), encode(payload))
    }

    #[test]
    fn test_parse_extracts_header_and_claims() {
        let header = json!({"alg": "RS256", "typ": "JWT", "kid": "key-1"});
        let payload = json!({
            "iss": "https://issuer.example/v2.0/",
            "aud": "api-audience",
            "scp": "Chat.chat",
            "exp": 1_900_000_000,
            "emails": ["alice@example.com"]
        });

        let (header, claims) = parse_unverified(&token(&header, &payload)).unwrap();

        assert_eq!(header.alg.as_deref(), Some("RS256"));
        assert_eq!(header.kid.as_deref(), Some("key-1"));
        assert_eq!(header.typ.as_deref(), Some("JWT"));
        assert_eq!(claims.iss, Some(json!("https://issuer.example/v2.0/")));
        assert_eq!(claims.aud, Some(json!("api-audience")));
        assert_eq!(claims.scp, Some(json!("Chat.chat")));
        assert_eq!(claims.exp, Some(json!(1_900_000_000)));
        assert!(claims.email.is_none());
        assert_eq!(claims.emails, Some(json!(["alice@example.com"])));
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let header = json!({"alg": "RS256", "kid": "k", "x5t": "thumb", "custom": 1});
        let payload = json!({"iss": "i", "tfp": "B2C_1_flow", "nonce": "n", "ver": "1.0"});

        let (header, claims) = parse_unverified(&token(&header, &payload)).unwrap();

        assert_eq!(header.kid.as_deref(), Some("k"));
        assert_eq!(claims.iss, Some(json!("i")));
    }

    #[test]
    fn test_parse_does_not_require_any_claim() {
        let (header, claims) = parse_unverified(&token(&json!({}), &json!({}))).unwrap();
        assert_eq!(header, TokenHeader::default());
        assert_eq!(claims, UnverifiedClaims::default());
    }

    #[test]
    fn test_non_string_header_fields_are_absent() {
        let header = json!({"alg": null, "kid": 12345});
        let (header, _) = parse_unverified(&token(&header, &json!({}))).unwrap();
        assert!(header.alg.is_none());
        assert!(header.kid.is_none());
    }

    #[test]
    fn test_wrong_number_of_segments_rejected() {
        assert_eq!(
            parse_unverified("not.a.valid.jwt.format"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            parse_unverified("only.two"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            parse_unverified("single"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(parse_unverified(""), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let payload = encode(&json!({}));
        let token = format!("!!!invalid!!!.{payload}.sig");
        assert_eq!(
            parse_unverified(&token),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_invalid_json_rejected() {
        let header = encode(&json!({"alg": "RS256"}));
        let payload = URL_SAFE_NO_PAD.encode(b"not valid json");
        let token = format!("{header}.{payload}.sig");
        assert_eq!(
            parse_unverified(&token),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let token = token(&json!({"alg": "RS256"}), &json!(["iss", "aud"]));
        assert_eq!(
            parse_unverified(&token),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_empty_header_segment_rejected() {
        let token = format!(".{}.sig", encode(&json!({})));
        assert_eq!(
            parse_unverified(&token),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_padded_segments_tolerated() {
        let header = URL_SAFE.encode(br#"{"alg":"RS256"}"#);
        let payload = URL_SAFE.encode(br#"{"iss":"x"}"#);
        assert!(header.ends_with('=') || payload.ends_with('='));

        let (header, claims) = parse_unverified(&format!("{header}.{payload}.sig")).unwrap();
        assert_eq!(header.alg.as_deref(), Some("RS256"));
        assert_eq!(claims.iss, Some(json!("x")));
    }

    #[test]
    fn test_oversized_token_rejected_before_parsing() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            parse_unverified(&token),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_error_message_is_generic() {
        assert_eq!(JwtValidationError::TokenTooLarge.to_string(), "Malformed token");
        assert_eq!(JwtValidationError::MalformedToken.to_string(), "Malformed token");
    }

    #[test]
    fn test_debug_redacts_identity_claims() {
        let claims = UnverifiedClaims {
            email: Some(json!("alice@example.com")),
            emails: Some(json!(["alice@example.com"])),
            ..UnverifiedClaims::default()
        };

        let debug = format!("{claims:?}");
        assert!(!debug.contains("alice@example.com"));
        assert!(debug.contains("[REDACTED]"));
    }
}
