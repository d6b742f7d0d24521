use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::agent::ContextPolicy;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are BitCake, an assistant that manages a Transmission torrent client.
Use the available tools to inspect and change torrents; never invent torrent ids,
look them up first. Confirm destructive actions (removing torrents or deleting data)
before performing them. Answer concisely, in the user's language.";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub ai: AiConfig,
    #[serde(default)]
    pub transmission: TransmissionConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Connection settings for the OpenAI-compatible chat endpoint.
///
/// Mutable at runtime through `AgentScheduler::update_config`.
#[derive(Deserialize, Clone, PartialEq)]
pub struct AiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1` (no trailing `/chat/completions`)
    pub endpoint: String,
    /// Supports ${ENV_VAR} substitution
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: Option<String>,
    /// Transport timeout for chat requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct TransmissionConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Supports ${ENV_VAR} substitution
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
    #[serde(default = "default_keep_recent_messages")]
    pub keep_recent_messages: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Overall deadline for one chat call. No deadline when absent.
    #[serde(default)]
    pub chat_timeout_secs: Option<u64>,
}

fn default_model() -> Option<String> {
    Some("gpt-3.5-turbo".to_string())
}

fn default_request_timeout() -> u64 {
    60
}

fn default_rpc_url() -> String {
    "http://localhost:9091/transmission/rpc".to_string()
}

fn default_rpc_timeout() -> u64 {
    30
}

fn default_max_iterations() -> u32 {
    5
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_context_messages() -> usize {
    20
}

fn default_keep_recent_messages() -> usize {
    10
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            username: None,
            password: None,
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            system_prompt: default_system_prompt(),
            max_context_messages: default_max_context_messages(),
            keep_recent_messages: default_keep_recent_messages(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            chat_timeout_secs: None,
        }
    }
}

impl AiConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: default_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// True when both the endpoint and the API key are filled in
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Endpoint without trailing slash, for URL joining
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

// The API key must never reach the logs.
impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl fmt::Debug for TransmissionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransmissionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AgentConfig {
    pub fn context_policy(&self) -> ContextPolicy {
        ContextPolicy {
            max_messages: self.max_context_messages,
            keep_recent: self.keep_recent_messages,
        }
    }

    pub fn chat_timeout(&self) -> Option<Duration> {
        self.chat_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${OPENAI_API_KEY}
        let expanded = shellexpand::env(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [ai]
        endpoint = "https://api.example.com/v1"
        api_key = "sk-test"
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.ai.model.as_deref(), Some("gpt-3.5-turbo"));
        assert_eq!(config.ai.request_timeout_secs, 60);
        assert_eq!(config.transmission.url, "http://localhost:9091/transmission/rpc");
        assert!(config.transmission.username.is_none());
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.max_tokens, 2000);
        assert!((config.agent.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.agent.chat_timeout().is_none());
        assert!(config.agent.system_prompt.contains("Transmission"));
    }

    #[test]
    fn test_full_config() {
        let config: Config = toml::from_str(
            r#"
            [ai]
            endpoint = "http://localhost:11434/v1/"
            api_key = "ollama"
            model = "qwen2.5"

            [transmission]
            url = "http://nas:9091/transmission/rpc"
            username = "admin"
            password = "secret"

            [agent]
            max_iterations = 8
            max_context_messages = 30
            keep_recent_messages = 12
            chat_timeout_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.ai.base_url(), "http://localhost:11434/v1");
        assert_eq!(config.ai.model.as_deref(), Some("qwen2.5"));
        assert_eq!(config.transmission.username.as_deref(), Some("admin"));
        assert_eq!(config.agent.max_iterations, 8);
        let policy = config.agent.context_policy();
        assert_eq!(policy.max_messages, 30);
        assert_eq!(policy.keep_recent, 12);
        assert_eq!(config.agent.chat_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_missing_ai_section_rejected() {
        let result: Result<Config, _> = toml::from_str("[agent]\nmax_iterations = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_is_configured() {
        assert!(AiConfig::new("https://api.example.com", "key").is_configured());
        assert!(!AiConfig::new("  ", "key").is_configured());
        assert!(!AiConfig::new("https://api.example.com", "").is_configured());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let ai = AiConfig::new("https://api.example.com", "sk-very-secret");
        let rendered = format!("{ai:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));

        let rpc = TransmissionConfig {
            password: Some("hunter2".to_string()),
            ..TransmissionConfig::default()
        };
        assert!(!format!("{rpc:?}").contains("hunter2"));
    }

    #[test]
    fn test_load_expands_env_vars() {
        std::env::set_var("BITCAKE_TEST_API_KEY", "sk-from-env");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[ai]\nendpoint = \"https://api.example.com/v1\"\napi_key = \"${{BITCAKE_TEST_API_KEY}}\"\n"
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.ai.api_key, "sk-from-env");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load("/nonexistent/bitcake/agent.toml").is_err());
    }
}
