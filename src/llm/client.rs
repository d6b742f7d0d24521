//! `LlmClient` trait: abstraction over the chat-completions backend.
//!
//! The scheduler talks to the model exclusively through this trait, so a
//! scripted client can stand in for the network in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{ChatRequest, ChatResponse};
use crate::config::AiConfig;
use crate::error::LlmError;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one chat-completion request and returns the decoded response.
    ///
    /// When `request.model` is `None` the client fills in the model from
    /// its current configuration.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Fetches the raw `/models` listing with the given timeout.
    ///
    /// Non-success statuses are reported as [`LlmError::Status`].
    async fn fetch_models(&self, timeout: Duration) -> Result<Value, LlmError>;

    /// Swaps endpoint, key and model. Requests issued afterwards use the
    /// new values; the underlying HTTP client is kept.
    async fn update_config(&self, config: AiConfig);

    /// Snapshot of the active configuration.
    async fn config(&self) -> AiConfig;
}
