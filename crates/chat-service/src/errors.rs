//! Chat service error types.
//!
//! `AuthError` is the rejection taxonomy of the token-validation core. Its
//! `Display` output is the stable, client-visible reason string; it never
//! contains the token or any key material.
//!
//! `ChatError` is the HTTP-facing error. All variants map to a status code
//! and a `{"error": "<message>"}` body via the `IntoResponse` impl. Internal
//! details are logged server-side, not returned.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Reason a bearer token was rejected.
///
/// Every variant is recoverable from the caller's perspective and maps to a
/// 401 response. `DiscoveryUnavailable` is fatal only during startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Invalid Authorization header format (should be 'Bearer <token>')")]
    MalformedHeader,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Issuer mismatch")]
    IssuerMismatch,

    #[error("Audience mismatch")]
    AudienceMismatch,

    #[error("Scope mismatch")]
    ScopeMismatch,

    #[error("exp not found in claims")]
    MissingExpiry,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Email not in allowed list")]
    IdentityNotAllowed,

    #[error("alg not found in header")]
    MissingAlgorithm,

    #[error("Signing key not found")]
    KeyNotFound,

    /// Cryptographic or structural verification failure, carrying the JWT
    /// library's description of the failure kind.
    #[error("{0}")]
    SignatureInvalid(String),

    #[error("Signing keys unavailable: {0}")]
    DiscoveryUnavailable(String),
}

impl AuthError {
    /// Stable machine-readable code, used as a bounded metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::ScopeMismatch => "scope_mismatch",
            AuthError::MissingExpiry => "missing_expiry",
            AuthError::TokenExpired => "token_expired",
            AuthError::IdentityNotAllowed => "identity_not_allowed",
            AuthError::MissingAlgorithm => "missing_algorithm",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::SignatureInvalid(_) => "signature_invalid",
            AuthError::DiscoveryUnavailable(_) => "discovery_unavailable",
        }
    }
}

impl From<common::jwt::JwtValidationError> for AuthError {
    fn from(_: common::jwt::JwtValidationError) -> Self {
        AuthError::MalformedToken
    }
}

/// Chat service error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - BadRequest: 400 Bad Request
/// - UpstreamUnavailable: 502 Bad Gateway
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl ChatError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::Unauthorized(_) => 401,
            ChatError::BadRequest(_) => 400,
            ChatError::UpstreamUnavailable(_) => 502,
            ChatError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ChatError::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason.to_string()),
            ChatError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ChatError::UpstreamUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "chat.availability", reason = %reason, "Chat backend unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "Chat backend unavailable".to_string(),
                )
            }
            ChatError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        let mut response = (status, Json(ErrorResponse { error: message })).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer error=\"invalid_token\""),
            );
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_auth_error_reason_strings_are_stable() {
        let cases = [
            (AuthError::MissingHeader, "Authorization header is missing"),
            (
                AuthError::MalformedHeader,
                "Invalid Authorization header format (should be 'Bearer <token>')",
            ),
            (AuthError::MalformedToken, "Malformed token"),
            (AuthError::IssuerMismatch, "Issuer mismatch"),
            (AuthError::AudienceMismatch, "Audience mismatch"),
            (AuthError::ScopeMismatch, "Scope mismatch"),
            (AuthError::MissingExpiry, "exp not found in claims"),
            (AuthError::TokenExpired, "Token has expired"),
            (AuthError::IdentityNotAllowed, "Email not in allowed list"),
            (AuthError::MissingAlgorithm, "alg not found in header"),
            (AuthError::KeyNotFound, "Signing key not found"),
            (
                AuthError::SignatureInvalid("InvalidSignature".to_string()),
                "InvalidSignature",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_auth_error_codes_are_distinct() {
        let errors = [
            AuthError::MissingHeader,
            AuthError::MalformedHeader,
            AuthError::MalformedToken,
            AuthError::IssuerMismatch,
            AuthError::AudienceMismatch,
            AuthError::ScopeMismatch,
            AuthError::MissingExpiry,
            AuthError::TokenExpired,
            AuthError::IdentityNotAllowed,
            AuthError::MissingAlgorithm,
            AuthError::KeyNotFound,
            AuthError::SignatureInvalid(String::new()),
            AuthError::DiscoveryUnavailable(String::new()),
        ];

        let codes: std::collections::HashSet<_> = errors.iter().map(AuthError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_jwt_parse_errors_become_malformed_token() {
        let error: AuthError = common::jwt::JwtValidationError::TokenTooLarge.into();
        assert_eq!(error, AuthError::MalformedToken);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ChatError::Unauthorized(AuthError::KeyNotFound).status_code(),
            401
        );
        assert_eq!(ChatError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(
            ChatError::UpstreamUnavailable("x".to_string()).status_code(),
            502
        );
        assert_eq!(ChatError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_unauthorized() {
        let response = ChatError::Unauthorized(AuthError::TokenExpired).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.starts_with("Bearer"));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json, serde_json::json!({"error": "Token has expired"}));
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let response = ChatError::BadRequest("bad body".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "bad body");
    }

    #[tokio::test]
    async fn test_into_response_upstream_hides_details() {
        let response =
            ChatError::UpstreamUnavailable("connect to 10.0.0.3 refused".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "Chat backend unavailable");
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let response = ChatError::Internal.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "An internal error occurred");
    }
}
