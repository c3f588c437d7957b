//! Upstream chat-completion client.
//!
//! Forwards an authenticated caller's messages to an OpenAI-compatible
//! chat-completions endpoint and returns the assistant's reply text.
//!
//! # Security
//!
//! - The API key is held as a `SecretString` and only exposed when building
//!   the request header
//! - Message contents are never logged
//! - Upstream failures are logged server-side; callers get a generic 502

use crate::config::Config;
use crate::errors::ChatError;
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Default timeout for upstream requests in seconds.
const CHAT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Seam between the HTTP layer and the chat provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce the assistant reply for a list of chat messages.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::UpstreamUnavailable` if the provider cannot be
    /// reached or returns an unusable response.
    async fn complete(&self, messages: Value) -> Result<String, ChatError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Value,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible chat-completions APIs.
pub struct OpenAiChatClient {
    http_client: Client,
    endpoint: String,
    model: String,
    temperature: f64,
    api_key: Option<SecretString>,
}

impl OpenAiChatClient {
    /// Create a new client.
    pub fn new(
        endpoint: String,
        model: String,
        temperature: f64,
        api_key: Option<SecretString>,
    ) -> Result<Self, ChatError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(CHAT_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "chat.services.chat_client", error = %e, "Failed to build HTTP client");
                ChatError::Internal
            })?;

        Ok(Self {
            http_client,
            endpoint,
            model,
            temperature,
            api_key,
        })
    }

    /// Create a client from service configuration.
    pub fn from_config(config: &Config) -> Result<Self, ChatError> {
        Self::new(
            config.chat_upstream_url.clone(),
            config.chat_model.clone(),
            config.chat_temperature,
            config.openai_api_key.clone(),
        )
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<String, ChatError> {
        let status = response.status();

        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                error!(target: "chat.services.chat_client", status = %status, "Upstream rejected API key");
            } else {
                warn!(target: "chat.services.chat_client", status = %status, "Upstream returned error");
            }
            return Err(ChatError::UpstreamUnavailable(format!(
                "upstream returned {status}"
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|e| {
            error!(target: "chat.services.chat_client", error = %e, "Failed to parse upstream response");
            ChatError::UpstreamUnavailable("unparseable upstream response".to_string())
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                warn!(target: "chat.services.chat_client", "Upstream response has no message content");
                ChatError::UpstreamUnavailable("upstream response has no content".to_string())
            })
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, messages: Value) -> Result<String, ChatError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let mut builder = self.http_client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            error!(target: "chat.services.chat_client", error = %e, "Failed to reach upstream");
            ChatError::UpstreamUnavailable(format!("request failed: {e}"))
        })?;

        self.handle_response(response).await
    }
}

/// Mock chat backend for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Mock backend that records requests and returns a canned reply.
    pub struct MockChatBackend {
        reply: Option<String>,
        call_count: AtomicUsize,
        received: Mutex<Vec<Value>>,
    }

    impl MockChatBackend {
        /// Create a mock that always replies with `reply`.
        pub fn replying(reply: impl Into<String>) -> Self {
            Self {
                reply: Some(reply.into()),
                call_count: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock whose upstream is always unavailable.
        pub fn failing() -> Self {
            Self {
                reply: None,
                call_count: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Messages passed to each call, in order.
        pub fn received(&self) -> Vec<Value> {
            self.received
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl ChatBackend for MockChatBackend {
        async fn complete(&self, messages: Value) -> Result<String, ChatError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.received
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(messages);

            self.reply.clone().ok_or_else(|| {
                ChatError::UpstreamUnavailable("Mock chat backend error".to_string())
            })
        }
    }
}
