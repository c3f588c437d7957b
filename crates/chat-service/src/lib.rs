//! Chat Service Library
//!
//! An HTTP front for a chat-completion provider that only admits callers
//! holding a bearer token from the configured identity provider:
//!
//! - JWKS loading at startup, with optional background refresh
//! - Policy checks on unverified claims (issuer, audience, scope, expiry, email allowlist)
//! - RSA signature verification against the cached keys
//! - Forwarding accepted chat requests upstream
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth::AuthGate
//!               -> handlers/*.rs -> services/chat_client.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token validation pipeline
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Auth and HTTP metrics middleware
//! - `models` - Response models
//! - `observability` - Metrics
//! - `routes` - Axum router setup
//! - `services` - Upstream chat client
//! - `tasks` - Background tasks

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod tasks;
