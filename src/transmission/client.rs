//! Transmission JSON-RPC client.
//!
//! Calls `POST {url}` with `{"method", "arguments"}`. Transmission guards
//! against CSRF with a session id: the first request is answered with
//! `409 Conflict` carrying `X-Transmission-Session-Id`, and the request is
//! replayed with that header. The id is cached until the daemon rotates it.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::{RpcMethod, TorrentApi};
use crate::config::TransmissionConfig;

const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    arguments: &'a Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    session_id: Mutex<Option<String>>,
}

impl TransmissionClient {
    pub fn new(config: TransmissionConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            session_id: Mutex::new(None),
        }
    }

    async fn send(&self, body: &RpcRequest<'_>) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.config.url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(body);

        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }
        if let Some(id) = self.session_id.lock().await.as_deref() {
            request = request.header(SESSION_ID_HEADER, id);
        }

        request
            .send()
            .await
            .with_context(|| format!("Transmission RPC request failed ({})", body.method))
    }
}

#[async_trait]
impl TorrentApi for TransmissionClient {
    async fn call(&self, method: RpcMethod, arguments: Value) -> Result<Value> {
        let body = RpcRequest {
            method: method.as_str(),
            arguments: &arguments,
        };

        debug!("Transmission RPC: {method}");

        let mut response = self.send(&body).await?;

        if response.status() == StatusCode::CONFLICT {
            let Some(id) = response
                .headers()
                .get(SESSION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
            else {
                bail!("Transmission answered 409 without a session id");
            };
            debug!("Transmission session id refreshed");
            *self.session_id.lock().await = Some(id.to_string());
            response = self.send(&body).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            bail!("Transmission RPC authentication failed (check username/password)");
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Transmission RPC error ({status}): {text}");
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Transmission response ({method})"))?;

        if rpc.result != "success" {
            bail!("Transmission {method} failed: {}", rpc.result);
        }

        Ok(rpc.arguments)
    }
}
