//! OpenAI-compatible chat-completions provider.
//!
//! Calls `POST {endpoint}/chat/completions` with a bearer token and
//! `GET {endpoint}/models` for listings. Works with OpenAI itself and the
//! many servers that mirror its API (Ollama `/v1`, vLLM, LM Studio, ...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::client::LlmClient;
use super::{ChatRequest, ChatResponse};
use crate::config::AiConfig;
use crate::error::LlmError;

/// Client for an OpenAI-compatible endpoint.
///
/// The configuration sits behind a lock so it can be swapped while the
/// client is shared; the `reqwest::Client` (and its connection pool)
/// lives for the whole lifetime of the value.
pub struct OpenAiClient {
    client: Client,
    config: RwLock<AiConfig>,
}

impl OpenAiClient {
    pub fn new(config: AiConfig) -> Self {
        Self {
            client: Client::new(),
            config: RwLock::new(config),
        }
    }
}

/// Turns a non-success response into [`LlmError::Status`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Status { status, body })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, mut request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let config = self.config.read().await.clone();
        if request.model.is_none() {
            request.model = config.model.clone();
        }

        let url = format!("{}/chat/completions", config.base_url());

        debug!(
            "Calling chat API ({}) with {} messages{}",
            request.model.as_deref().unwrap_or("default model"),
            request.messages.len(),
            if request.tools.is_some() { " + tools" } else { "" }
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&config.api_key)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;

        if let Some(usage) = parsed.usage {
            info!(
                "LLM response: {} in / {} out tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(parsed)
    }

    async fn fetch_models(&self, timeout: Duration) -> Result<Value, LlmError> {
        let config = self.config.read().await.clone();
        let url = format!("{}/models", config.base_url());

        let response = self
            .client
            .get(&url)
            .bearer_auth(&config.api_key)
            .timeout(timeout)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))
    }

    async fn update_config(&self, config: AiConfig) {
        info!(
            "Chat endpoint updated: {} ({})",
            config.endpoint,
            config.model.as_deref().unwrap_or("default model")
        );
        *self.config.write().await = config;
    }

    async fn config(&self) -> AiConfig {
        self.config.read().await.clone()
    }
}
