//! Chat service response models.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status ("healthy").
    pub status: String,

    /// Number of signing keys in the current JWKS snapshot.
    pub keys_loaded: usize,
}
