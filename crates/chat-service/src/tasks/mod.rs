//! Background tasks for the chat service.

pub mod jwks_refresh;

pub use jwks_refresh::start_jwks_refresh;
