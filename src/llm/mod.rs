pub mod client;
pub mod openai;
pub mod types;

pub use client::LlmClient;
pub use openai::OpenAiClient;
pub use types::{
    AssistantMessage, ChatRequest, ChatResponse, Choice, FunctionCall, FunctionDefinition,
    Message, ModelInfo, Role, ToolCall, ToolDefinition, Usage,
};

/// Scripted `LlmClient` for scheduler and runtime tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use super::{ChatRequest, ChatResponse, LlmClient};
    use crate::config::AiConfig;
    use crate::error::LlmError;

    /// Replays canned responses in order; the last one repeats forever.
    pub struct ScriptedLlm {
        responses: Vec<Value>,
        cursor: Mutex<usize>,
        requests: Mutex<Vec<ChatRequest>>,
        models: Result<Value, u16>,
        config: Mutex<AiConfig>,
    }

    impl ScriptedLlm {
        fn build(responses: Vec<Value>, models: Result<Value, u16>) -> Arc<Self> {
            Arc::new(Self {
                responses,
                cursor: Mutex::new(0),
                requests: Mutex::new(Vec::new()),
                models,
                config: Mutex::new(AiConfig::new("http://localhost", "sk-test")),
            })
        }

        pub fn new(responses: Vec<Value>) -> Arc<Self> {
            Self::build(responses, Ok(json!({"data": [{"id": "gpt-4o"}]})))
        }

        /// `Err(code)` makes `/models` answer with that HTTP status.
        pub fn with_models(models: Result<Value, u16>) -> Arc<Self> {
            Self::build(vec![text_response("")], models)
        }

        pub fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            let mut cursor = self.cursor.lock().unwrap();
            let index = (*cursor).min(self.responses.len() - 1);
            *cursor += 1;
            Ok(serde_json::from_value(self.responses[index].clone()).unwrap())
        }

        async fn fetch_models(&self, _timeout: Duration) -> Result<Value, LlmError> {
            match &self.models {
                Ok(body) => Ok(body.clone()),
                Err(code) => Err(LlmError::Status {
                    status: StatusCode::from_u16(*code).unwrap(),
                    body: String::new(),
                }),
            }
        }

        async fn update_config(&self, config: AiConfig) {
            *self.config.lock().unwrap() = config;
        }

        async fn config(&self) -> AiConfig {
            self.config.lock().unwrap().clone()
        }
    }

    pub fn text_response(content: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]})
    }

    /// One response requesting `(id, name, arguments)` tool calls.
    pub fn tool_response(calls: &[(&str, &str, &str)]) -> Value {
        let calls: Vec<Value> = calls
            .iter()
            .map(|(id, name, args)| {
                json!({"id": id, "type": "function", "function": {"name": name, "arguments": args}})
            })
            .collect();
        json!({"choices": [{"message": {"role": "assistant", "content": null, "tool_calls": calls}, "finish_reason": "tool_calls"}]})
    }
}
