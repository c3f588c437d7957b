//! Authentication middleware for protected routes.
//!
//! Hands the raw Authorization header to the `AuthGate` and injects the
//! verified claims into request extensions.

use crate::auth::{AuthGate, VerifiedClaims};
use crate::errors::{AuthError, ChatError};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token validation pipeline.
    pub gate: Arc<AuthGate>,
}

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with `{"error": "<reason>"}` and a
///   WWW-Authenticate header if the token is rejected
/// - Continues to next handler with claims in extensions if the token is accepted
#[instrument(skip(state, req, next), name = "chat.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ChatError> {
    let authorization = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| {
            tracing::debug!(target: "chat.middleware.auth", "Authorization header is not valid ASCII");
            ChatError::Unauthorized(AuthError::MalformedHeader)
        })?),
    };

    let claims = state.gate.validate(authorization)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for extracting claims from request.
pub trait ClaimsExt {
    /// Get the verified claims from request extensions.
    ///
    /// Returns `None` if auth middleware was not applied to this request.
    fn claims(&self) -> Option<&VerifiedClaims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&VerifiedClaims> {
        self.extensions().get::<VerifiedClaims>()
    }
}
