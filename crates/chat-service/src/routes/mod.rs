//! HTTP routes for the chat service.
//!
//! Defines the Axum router and application state.

use crate::auth::{AuthGate, KeySource};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::ChatBackend;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Request timeout. Covers the upstream chat call.
const REQUEST_TIMEOUT_SECS: u64 = 90;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Token validation pipeline.
    pub auth_gate: Arc<AuthGate>,

    /// Signing keys, shared with the gate and the refresh task.
    pub key_source: Arc<KeySource>,

    /// Upstream chat provider.
    pub chat_backend: Arc<dyn ChatBackend>,
}

impl AppState {
    /// Assemble state around an already-loaded key source.
    pub fn new(
        config: Config,
        key_source: Arc<KeySource>,
        chat_backend: Arc<dyn ChatBackend>,
    ) -> Self {
        let auth_gate = Arc::new(AuthGate::new(config.auth_policy(), Arc::clone(&key_source)));
        Self {
            config,
            auth_gate,
            key_source,
            chat_backend,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/chat` - Chat completion - requires authentication
/// - `/msal-signin` - Token acceptance check - requires authentication
/// - CORS for the configured origins
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - Request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        gate: Arc::clone(&state.auth_gate),
    });
    let cors = cors_layer(&state.config.cors_origins);

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/chat", post(handlers::chat))
        .route("/msal-signin", post(handlers::msal_signin))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflights before auth runs
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// CORS for the configured origins. Origins were validated at config load;
/// any that fail to parse here are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
