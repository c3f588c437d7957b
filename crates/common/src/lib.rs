//! Common utilities shared across the chat service crates.

#![warn(clippy::pedantic)]

/// Module for unverified JWT parsing (structure, header, claims)
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;
