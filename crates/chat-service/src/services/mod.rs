//! Service clients for the chat service.

pub mod chat_client;

pub use chat_client::{ChatBackend, OpenAiChatClient};
