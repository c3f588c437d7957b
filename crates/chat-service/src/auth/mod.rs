//! Authentication module for the chat service.
//!
//! Validates bearer tokens issued by the identity provider.
//!
//! # Components
//!
//! - `jwks` - JWKS client and the read-only key snapshot
//! - `policy` - issuer/audience/scope/expiry/identity checks on unverified claims
//! - `jwt` - RSA signature verification
//! - `claims` - claims of a verified token
//! - `gate` - header parsing and the full validation pipeline

pub mod claims;
pub mod gate;
pub mod jwks;
pub mod jwt;
pub mod policy;

pub use claims::VerifiedClaims;
pub use gate::AuthGate;
pub use jwks::{JwkSet, JwksClient, KeySource};
pub use jwt::SignatureVerifier;
pub use policy::{AllowList, AuthPolicy};
