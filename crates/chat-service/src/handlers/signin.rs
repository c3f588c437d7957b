//! Sign-in confirmation endpoint.
//!
//! The browser client calls this right after acquiring a token so the user
//! learns immediately whether the service will accept it. All of the work
//! happens in the auth middleware.

use crate::auth::VerifiedClaims;
use axum::Extension;
use tracing::instrument;

/// Handler for POST /msal-signin
///
/// Returns `200 "Success"` for an accepted token.
#[instrument(skip_all, name = "chat.signin")]
pub async fn msal_signin(Extension(claims): Extension<VerifiedClaims>) -> &'static str {
    tracing::info!(target: "chat.handlers.signin", scope = ?claims.scp, "Sign-in token accepted");
    "Success"
}
