//! Liveness probe.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Health check handler.
///
/// The process only serves once the initial JWKS load has succeeded, so a
/// response always means the service is usable.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "keys_loaded": 2
/// }
/// ```
#[instrument(skip_all, name = "chat.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        keys_loaded: state.key_source.key_count(),
    })
}
