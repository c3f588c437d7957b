//! Test server harness for E2E testing
//!
//! Provides `TestChatServer` for spawning real chat service instances
//! against a mock JWKS endpoint and a mock chat backend.

use crate::crypto_fixtures::TestKeypair;
use crate::jwks_mock::JwksMock;
use crate::test_ids::{
    ALLOWED_EMAIL, SECOND_ALLOWED_EMAIL, TEST_AUDIENCE, TEST_ISSUER, TEST_SCOPE,
};
use chat_service::auth::{JwksClient, KeySource};
use chat_service::config::Config;
use chat_service::routes::{self, AppState};
use chat_service::services::chat_client::mock::MockChatBackend;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Reply returned by the default mock chat backend.
pub const MOCK_CHAT_REPLY: &str = "Hello from the assistant";

/// Test harness for spawning the chat service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_signin() -> Result<()> {
///     let server = TestChatServer::spawn().await?;
///     let token = TestTokenBuilder::new().sign_with(&TestKeypair::primary())?;
///
///     let response = reqwest::Client::new()
///         .post(format!("{}/msal-signin", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestChatServer {
    addr: SocketAddr,
    config: Config,
    jwks: JwksMock,
    key_source: Arc<KeySource>,
    chat_backend: Arc<MockChatBackend>,
    _handle: JoinHandle<()>,
}

impl TestChatServer {
    /// Spawn a server trusting the primary test key, with a replying backend.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(
            &[&TestKeypair::primary()],
            Arc::new(MockChatBackend::replying(MOCK_CHAT_REPLY)),
        )
        .await
    }

    /// Spawn a server publishing `keypairs` in its JWKS and using `chat_backend`.
    ///
    /// The server will:
    /// - Start a mock JWKS endpoint and load keys from it
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        keypairs: &[&TestKeypair],
        chat_backend: Arc<MockChatBackend>,
    ) -> Result<Self, anyhow::Error> {
        let jwks = JwksMock::start(keypairs).await;

        let vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH_ISSUER".to_string(), TEST_ISSUER.to_string()),
            ("AUTH_JWKS_URL".to_string(), jwks.url()),
            ("AUTH_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("AUTH_SCOPE".to_string(), TEST_SCOPE.to_string()),
            (
                "CA_ALLOWED_EMAILS".to_string(),
                serde_json::to_string(&[ALLOWED_EMAIL, SECOND_ALLOWED_EMAIL])?,
            ),
            (
                "CA_CORS_ORIGINS".to_string(),
                r#"["http://localhost:3000"]"#.to_string(),
            ),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwks_client = JwksClient::new(config.jwks_url.clone());
        let key_source = Arc::new(
            KeySource::load(&jwks_client)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load test keys: {}", e))?,
        );

        let state = Arc::new(AppState::new(
            config.clone(),
            Arc::clone(&key_source),
            chat_backend.clone(),
        ));

        // A standalone recorder; the global one can only be installed once per process
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            jwks,
            key_source,
            chat_backend,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mock JWKS endpoint the server loaded its keys from.
    pub fn jwks(&self) -> &JwksMock {
        &self.jwks
    }

    /// Key source shared with the running server.
    pub fn key_source(&self) -> &Arc<KeySource> {
        &self.key_source
    }

    /// Mock chat backend shared with the running server.
    pub fn chat_backend(&self) -> &MockChatBackend {
        &self.chat_backend
    }
}

impl Drop for TestChatServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestChatServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.addr().ip().is_loopback());

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["keys_loaded"], 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_server_fails_when_jwks_unavailable() {
        let jwks = JwksMock::start_with_response(wiremock::ResponseTemplate::new(500)).await;
        let client = JwksClient::new(jwks.url());

        assert!(KeySource::load(&client).await.is_err());
    }
}
