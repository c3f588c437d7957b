//! JWKS refresh background task.
//!
//! Periodically re-fetches the identity provider's signing keys and swaps
//! the `KeySource` snapshot. A failed fetch is logged and the previous
//! snapshot keeps serving.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is triggered.

use crate::auth::{JwksClient, KeySource};
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Start the JWKS refresh task.
///
/// The first refresh happens one `interval` after start, since startup has
/// already loaded the keys.
///
/// # Arguments
///
/// * `client` - JWKS endpoint client
/// * `keys` - Key source whose snapshot is replaced
/// * `interval` - Time between refreshes
/// * `cancel_token` - Token for graceful shutdown
#[instrument(skip_all, name = "chat.task.jwks_refresh")]
pub async fn start_jwks_refresh(
    client: JwksClient,
    keys: Arc<KeySource>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "chat.task.jwks_refresh",
        interval_seconds = interval.as_secs(),
        "Starting JWKS refresh task"
    );

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh_once(&client, &keys).await;
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "chat.task.jwks_refresh",
                    "JWKS refresh task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "chat.task.jwks_refresh", "JWKS refresh task stopped");
}

/// Fetch once and swap the snapshot on success.
///
/// Returns whether the snapshot was replaced.
pub async fn refresh_once(client: &JwksClient, keys: &KeySource) -> bool {
    match client.fetch().await {
        Ok(set) => {
            let count = set.len();
            keys.replace(set);
            metrics::record_jwks_refresh("success");
            metrics::set_jwks_keys(count);
            info!(target: "chat.task.jwks_refresh", key_count = count, "JWKS snapshot replaced");
            true
        }
        Err(e) => {
            metrics::record_jwks_refresh("error");
            warn!(
                target: "chat.task.jwks_refresh",
                error = %e,
                key_count = keys.key_count(),
                "JWKS refresh failed, keeping previous snapshot"
            );
            false
        }
    }
}
