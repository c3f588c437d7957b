//! Authorization policy over unverified claims.
//!
//! These checks run BEFORE signature verification so that obviously wrong
//! tokens are rejected without any cryptography. Passing the policy grants
//! nothing on its own; the token must still be verified.
//!
//! Checks run in a fixed order and stop at the first failure:
//! issuer, audience, scope, expiry, identity.

use crate::errors::AuthError;
use common::jwt::UnverifiedClaims;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Fixed set of email identities permitted to use the service.
#[derive(Clone, Default)]
pub struct AllowList {
    emails: HashSet<String>,
}

impl AllowList {
    /// Build an allowlist from configured emails. Matching is exact.
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `email` is permitted.
    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// Email addresses stay out of Debug output.
impl fmt::Debug for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowList")
            .field("count", &self.emails.len())
            .finish()
    }
}

/// Expected claim values for accepted tokens.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// Expected `iss`.
    pub issuer: String,

    /// Expected `aud`.
    pub audience: String,

    /// Expected `scp`, compared as a whole string.
    pub scope: String,

    /// Permitted email identities.
    pub allowed_emails: AllowList,
}

/// Check unverified claims against the policy at time `now` (Unix seconds).
///
/// # Errors
///
/// - `IssuerMismatch` - `iss` absent or not equal to the expected issuer
/// - `AudienceMismatch` - `aud` absent or not equal to the expected audience
/// - `ScopeMismatch` - `scp` absent or not equal to the expected scope
/// - `MissingExpiry` - `exp` absent or not a number
/// - `TokenExpired` - `now` is strictly after `exp`
/// - `IdentityNotAllowed` - neither `email` nor the first `emails` entry is allowed
pub fn check(claims: &UnverifiedClaims, policy: &AuthPolicy, now: i64) -> Result<(), AuthError> {
    if !matches_str(claims.iss.as_ref(), &policy.issuer) {
        tracing::debug!(target: "chat.auth.policy", "Issuer mismatch");
        return Err(AuthError::IssuerMismatch);
    }

    if !matches_str(claims.aud.as_ref(), &policy.audience) {
        tracing::debug!(target: "chat.auth.policy", "Audience mismatch");
        return Err(AuthError::AudienceMismatch);
    }

    if !matches_str(claims.scp.as_ref(), &policy.scope) {
        tracing::debug!(target: "chat.auth.policy", "Scope mismatch");
        return Err(AuthError::ScopeMismatch);
    }

    let Some(exp) = claims.exp.as_ref().and_then(Value::as_f64) else {
        tracing::debug!(target: "chat.auth.policy", "exp claim missing or not numeric");
        return Err(AuthError::MissingExpiry);
    };

    if (now as f64) > exp {
        tracing::debug!(target: "chat.auth.policy", exp = exp, now = now, "Token expired");
        return Err(AuthError::TokenExpired);
    }

    if !identity_allowed(claims, &policy.allowed_emails) {
        tracing::debug!(target: "chat.auth.policy", "Identity not in allowlist");
        return Err(AuthError::IdentityNotAllowed);
    }

    Ok(())
}

fn matches_str(value: Option<&Value>, expected: &str) -> bool {
    value.and_then(Value::as_str) == Some(expected)
}

/// `email` is checked first; otherwise only the FIRST entry of `emails`.
fn identity_allowed(claims: &UnverifiedClaims, allowed: &AllowList) -> bool {
    if let Some(email) = claims.email.as_ref().and_then(Value::as_str) {
        if allowed.contains(email) {
            return true;
        }
    }

    claims
        .emails
        .as_ref()
        .and_then(Value::as_array)
        .and_then(|emails| emails.first())
        .and_then(Value::as_str)
        .is_some_and(|first| allowed.contains(first))
}
