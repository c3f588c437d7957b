//! Observability module for the chat service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
