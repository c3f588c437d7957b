//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for credentials such as the upstream
//! chat provider API key. `SecretString` implements `Debug` with redaction, so
//! a config struct that derives or hand-writes `Debug` cannot leak the value
//! through `{:?}` or a tracing field.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let api_key = SecretString::from("sk-test-value");
//! assert!(!format!("{api_key:?}").contains("sk-test-value"));
//!
//! // Reading the value is always an explicit call.
//! let header = format!("Bearer {}", api_key.expose_secret());
//! assert!(header.ends_with("sk-test-value"));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
