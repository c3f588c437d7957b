//! # Chat Test Utilities
//!
//! Shared test utilities for the chat service.
//!
//! This crate provides:
//! - Deterministic RSA key fixtures with matching JWKs
//! - Claims builder (`TestTokenBuilder`)
//! - Mock JWKS endpoint (`JwksMock`)
//! - Server test harness (`TestChatServer` for E2E tests)
//! - Fixed test identities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestChatServer::spawn().await?;
//!     let token = TestTokenBuilder::new()
//!         .emails(&[ALLOWED_EMAIL])
//!         .sign_with(&TestKeypair::primary())?;
//!     // ...
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
