//! Mock identity provider JWKS endpoint

use crate::crypto_fixtures::{jwks_json, TestKeypair};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves the key set on.
pub const JWKS_PATH: &str = "/discovery/v2.0/keys";

/// Wiremock server publishing a JWKS.
pub struct JwksMock {
    server: MockServer,
}

impl JwksMock {
    /// Serve the public keys of `keypairs`.
    pub async fn start(keypairs: &[&TestKeypair]) -> Self {
        Self::start_with_response(ResponseTemplate::new(200).set_body_json(jwks_json(keypairs)))
            .await
    }

    /// Serve an arbitrary response on the JWKS path.
    pub async fn start_with_response(response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&server)
            .await;
        Self { server }
    }

    /// Replace the served response; later fetches see the new keys.
    pub async fn rotate(&self, response: ResponseTemplate) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Full JWKS URL.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of requests the endpoint has received.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}
