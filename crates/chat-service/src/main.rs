//! Chat Service
//!
//! Entry point for the authenticated chat-completion service.

use chat_service::auth::{JwksClient, KeySource};
use chat_service::config::Config;
use chat_service::observability::metrics::{init_metrics_recorder, set_jwks_keys};
use chat_service::routes::{self, AppState};
use chat_service::services::OpenAiChatClient;
use chat_service::tasks::start_jwks_refresh;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging comes up before config so config errors are logged
    let development = chat_service::config::parse_development_flag(
        std::env::var("CA_DEVELOPMENT").ok().as_deref(),
    );
    init_tracing(development);

    info!("Starting Chat Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        issuer = %config.issuer,
        jwks_url = %config.jwks_url,
        allowed_emails = config.allowed_emails.len(),
        development = config.development,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Startup fails if the keys cannot be loaded
    info!("Loading signing keys...");
    let jwks_client = JwksClient::new(config.jwks_url.clone());
    let key_source = Arc::new(KeySource::load(&jwks_client).await.map_err(|e| {
        error!("Failed to load signing keys: {}", e);
        e
    })?);
    set_jwks_keys(key_source.key_count());
    info!(key_count = key_source.key_count(), "Signing keys loaded");

    let chat_backend = Arc::new(OpenAiChatClient::from_config(&config).map_err(|e| {
        error!("Failed to create chat backend: {}", e);
        e
    })?);
    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; upstream requests will be sent without credentials");
    }

    let cancel_token = CancellationToken::new();
    let refresh_handle = config.jwks_refresh_interval.map(|interval| {
        tokio::spawn(start_jwks_refresh(
            jwks_client.clone(),
            Arc::clone(&key_source),
            interval,
            cancel_token.clone(),
        ))
    });

    let bind_address = config.bind_address.clone();
    let drain_period = config.drain_period;

    let state = Arc::new(AppState::new(config, key_source, chat_backend));
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Chat Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_period))
    .await?;

    cancel_token.cancel();
    if let Some(handle) = refresh_handle {
        if let Err(e) = handle.await {
            warn!("JWKS refresh task ended abnormally: {}", e);
        }
    }

    info!("Chat Service shutdown complete");

    Ok(())
}

/// JSON logs in production, human-readable logs in development.
fn init_tracing(development: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chat_service=info,chat=info,tower_http=info".into());

    let (pretty, json) = if development {
        (Some(tracing_subscriber::fmt::layer().pretty()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_period: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    if drain_period.is_zero() {
        info!("Skipping drain period (CHAT_DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {} seconds...", drain_period.as_secs());
        tokio::time::sleep(drain_period).await;
        info!("Drain period complete");
    }
}
