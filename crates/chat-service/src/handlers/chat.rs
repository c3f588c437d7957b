//! Chat endpoint.

use crate::auth::VerifiedClaims;
use crate::errors::ChatError;
use crate::routes::AppState;
use axum::extract::{rejection::JsonRejection, State};
use axum::{Extension, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /chat
///
/// Forwards the message list to the chat backend and returns the assistant
/// reply as plain text. The body must be a JSON array of chat messages.
///
/// # Errors
///
/// - 400 if the body is not a JSON array
/// - 502 if the backend fails
#[instrument(skip_all, name = "chat.chat")]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(_claims): Extension<VerifiedClaims>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<String, ChatError> {
    let Json(messages) = body.map_err(|e| {
        tracing::debug!(target: "chat.handlers.chat", error = %e, "Rejected chat request body");
        ChatError::BadRequest("Request body must be a JSON array of messages".to_string())
    })?;

    let count = match messages.as_array() {
        Some(list) => list.len(),
        None => {
            return Err(ChatError::BadRequest(
                "Request body must be a JSON array of messages".to_string(),
            ))
        }
    };

    tracing::debug!(target: "chat.handlers.chat", message_count = count, "Forwarding chat request");

    state.chat_backend.complete(messages).await
}
