//! HTTP request handlers for the chat service.

pub mod chat;
pub mod health;
pub mod metrics;
pub mod signin;

pub use chat::chat;
pub use health::health_check;
pub use metrics::metrics_handler;
pub use signin::msal_signin;
