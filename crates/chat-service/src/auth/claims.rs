//! Verified JWT claims.
//!
//! `VerifiedClaims` is produced only by the signature verifier after a
//! successful cryptographic check. Identity fields are redacted in Debug
//! output to prevent exposure in logs.
//!
//! Only `iss`, `aud` and `exp` are required to have their standard types.
//! Profile and identity claims of an unexpected type are read as absent, so
//! a token the policy accepted is never rejected over an unrelated claim.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Claims of a token whose signature, issuer, audience and expiry have been
/// verified.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    /// Issuer.
    pub iss: String,

    /// Audience (the API's application ID).
    pub aud: String,

    /// Expiration timestamp (Unix epoch seconds). Fractional values are
    /// truncated.
    #[serde(deserialize_with = "numeric_date")]
    pub exp: i64,

    /// Space-separated scopes granted to this token.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub scp: Option<String>,

    /// Subject (object ID of the user) - redacted in Debug output.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<String>,

    /// Display name - redacted in Debug output.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,

    /// Single email identity - redacted in Debug output.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,

    /// Email identities from B2C user flows, string entries only - redacted
    /// in Debug output.
    #[serde(
        default,
        deserialize_with = "lenient_string_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub emails: Option<Vec<String>>,
}

/// NumericDate as integer or float.
fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(exp) = value.as_i64() {
        return Ok(exp);
    }
    match value.as_f64() {
        Some(exp) if exp.is_finite() => Ok(exp.trunc() as i64),
        _ => Err(serde::de::Error::custom("exp is not a numeric date")),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

impl fmt::Debug for VerifiedClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |present: bool| if present { Some("[REDACTED]") } else { None };
        f.debug_struct("VerifiedClaims")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("scp", &self.scp)
            .field("sub", &redact(self.sub.is_some()))
            .field("name", &redact(self.name.is_some()))
            .field("email", &redact(self.email.is_some()))
            .field("emails", &redact(self.emails.is_some()))
            .finish()
    }
}

impl VerifiedClaims {
    /// Check if the token has a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scp
            .as_deref()
            .is_some_and(|scp| scp.split_whitespace().any(|s| s == scope))
    }

    /// The identity the allowlist accepted: `email`, else the first `emails` entry.
    pub fn primary_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or_else(|| self.emails.as_ref().and_then(|e| e.first()).map(String::as_str))
    }
}
