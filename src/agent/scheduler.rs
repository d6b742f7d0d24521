//! The tool-calling loop.
//!
//! One `chat` call alternates model round-trips and sequential skill
//! execution until the model answers without tool calls or the iteration
//! budget runs out. All per-call state lives in [`ChatState`]; the
//! scheduler itself only holds the LLM client and the skill registry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::context::ContextPolicy;
use super::progress::{percent, ProgressEvent, ProgressFn, ProgressStep};
use crate::config::{AgentConfig, AiConfig};
use crate::error::{AgentError, LlmError, RegistryError};
use crate::llm::{ChatRequest, LlmClient, Message, ModelInfo, ToolCall, ToolDefinition};
use crate::skills::schema::{parse_arguments, validate};
use crate::skills::{Skill, SkillRegistry};

const CONNECTION_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Record of one tool invocation, returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCall {
    pub skill_name: String,
    /// Validated arguments on success, the parsed arguments when validation
    /// or execution failed, `{}` when they did not parse.
    pub parameters: Value,
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Model round-trips allowed before giving up. 0 is treated as 1.
    pub max_iterations: u32,
    pub cancel: CancellationToken,
    /// Overall deadline for the whole call.
    pub deadline: Option<Duration>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub content: String,
    pub skill_calls: Vec<SkillCall>,
    /// Model round-trips performed.
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct AgentScheduler {
    llm: Arc<dyn LlmClient>,
    registry: SkillRegistry,
    context: ContextPolicy,
    temperature: f32,
    max_tokens: u32,
}

impl AgentScheduler {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        let defaults = AgentConfig::default();
        Self {
            llm,
            registry: SkillRegistry::new(),
            context: defaults.context_policy(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    /// Applies context limits and sampling settings from the `[agent]` section.
    pub fn with_agent_config(mut self, config: &AgentConfig) -> Self {
        self.context = config.context_policy();
        self.temperature = config.temperature;
        self.max_tokens = config.max_tokens;
        self
    }

    pub fn register_skill(&mut self, skill: Arc<dyn Skill>) -> Result<(), RegistryError> {
        self.registry.register(skill)
    }

    pub fn register_skills(
        &mut self,
        skills: impl IntoIterator<Item = Arc<dyn Skill>>,
    ) -> Result<(), RegistryError> {
        self.registry.register_batch(skills)
    }

    pub fn skills(&self) -> &[Arc<dyn Skill>] {
        self.registry.list()
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub async fn update_config(&self, config: AiConfig) {
        self.llm.update_config(config).await;
    }

    // ── Diagnostics ──────────────────────────────────────

    /// Probes the `/models` endpoint. Never fails; the outcome is reported
    /// in the returned status.
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.llm.fetch_models(CONNECTION_TEST_TIMEOUT).await {
            Ok(_) => ConnectionStatus {
                success: true,
                message: "Connection successful".to_string(),
                error: None,
            },
            Err(e) => {
                let error = match &e {
                    LlmError::Status { status, .. } => format!("HTTP {}", status.as_u16()),
                    other => other.to_string(),
                };
                warn!("AI connection test failed: {error}");
                ConnectionStatus {
                    success: false,
                    message: "Connection failed".to_string(),
                    error: Some(error),
                }
            }
        }
    }

    /// Available models, or an empty list on any failure.
    pub async fn get_models(&self) -> Vec<ModelInfo> {
        match self.llm.fetch_models(CONNECTION_TEST_TIMEOUT).await {
            Ok(body) => parse_models(&body),
            Err(e) => {
                warn!("Failed to fetch models: {e}");
                Vec::new()
            }
        }
    }

    // ── Chat loop ────────────────────────────────────────

    pub async fn chat(
        &self,
        messages: Vec<Message>,
        options: ChatOptions,
        progress: ProgressFn<'_>,
    ) -> Result<ChatOutcome, AgentError> {
        let max = options.max_iterations.max(1);
        let guard = Guard {
            cancel: &options.cancel,
            deadline: options.deadline.map(|d| Instant::now() + d),
        };
        let tools = self.tool_declarations();

        let mut state = ChatState {
            iteration: 0,
            transcript: self.context.trim(messages),
            skill_calls: Vec::new(),
        };

        while state.iteration < max {
            state.iteration += 1;
            debug!("Chat iteration {}/{max}", state.iteration);

            progress(ProgressEvent {
                step: ProgressStep::Thinking {
                    iteration: state.iteration,
                    max,
                },
                percent: percent(state.iteration - 1, 0.0, max),
            });

            let request = ChatRequest {
                messages: state.transcript.clone(),
                model: None,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tools.clone(),
            };

            progress(ProgressEvent {
                step: ProgressStep::CallingApi,
                percent: percent(state.iteration - 1, 0.0, max),
            });

            let response = match guard.run(self.llm.complete(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    error!("Chat request failed: {e}");
                    return Err(e.into());
                }
                Err(interrupt) => return Err(interrupt.into_error(state.skill_calls)),
            };

            let Some(choice) = response.choices.into_iter().next() else {
                error!("Chat response contained no choices");
                return Err(AgentError::NoChoices);
            };

            let content = choice.message.content.clone().unwrap_or_default();
            let calls: Vec<ToolCall> = choice
                .message
                .tool_calls()
                .iter()
                .cloned()
                .map(with_call_id)
                .collect();

            if calls.is_empty() {
                progress(ProgressEvent {
                    step: ProgressStep::Done,
                    percent: 100.0,
                });
                info!(
                    "Chat finished after {} iteration(s), {} skill call(s)",
                    state.iteration,
                    state.skill_calls.len()
                );
                return Ok(ChatOutcome {
                    content,
                    skill_calls: state.skill_calls,
                    iterations: state.iteration,
                });
            }

            state
                .transcript
                .push(Message::assistant_tool_calls(content, calls.clone()));

            let total = calls.len();
            for (k, call) in calls.iter().enumerate() {
                progress(ProgressEvent {
                    step: ProgressStep::ExecutingSkill {
                        name: call.function.name.clone(),
                        index: k + 1,
                        total,
                    },
                    percent: percent(state.iteration - 1, (k + 1) as f32 / total as f32, max),
                });

                if let Err(interrupt) = self.dispatch(call, &guard, &mut state).await {
                    return Err(interrupt.into_error(state.skill_calls));
                }
            }

            state.transcript = self.context.trim(std::mem::take(&mut state.transcript));
        }

        error!("Max iterations ({max}) reached");
        Err(AgentError::MaxIterations {
            max,
            skill_calls: state.skill_calls,
        })
    }

    fn tool_declarations(&self) -> Option<Vec<ToolDefinition>> {
        if self.registry.is_empty() {
            None
        } else {
            Some(self.registry.to_tool_schema())
        }
    }

    /// Runs one tool call and appends exactly one tool-result message.
    ///
    /// Skill failures are folded into the transcript; only cancellation or
    /// the deadline abort the loop.
    async fn dispatch(
        &self,
        call: &ToolCall,
        guard: &Guard<'_>,
        state: &mut ChatState,
    ) -> Result<(), Interrupt> {
        let name = call.function.name.as_str();
        info!("Executing skill {name} (call {})", call.id);

        let parsed = parse_arguments(&call.function.arguments);
        let parameters = parsed.as_ref().cloned().unwrap_or_else(|_| json!({}));

        let outcome = match (self.registry.get(name), parsed) {
            (None, _) => Err(format!("Skill not found: {name}")),
            (Some(_), Err(e)) => Err(e.to_string()),
            (Some(skill), Ok(raw)) => match validate(&skill.parameters(), raw) {
                Err(e) => Err(e.to_string()),
                Ok(args) => {
                    let resolved = args.clone().into_value();
                    match guard.run(skill.execute(args)).await {
                        Ok(Ok(result)) => Ok((resolved, result)),
                        Ok(Err(e)) => Err(format!("{e:#}")),
                        Err(interrupt) => {
                            warn!("Skill {name} interrupted: {}", interrupt.message());
                            state.skill_calls.push(SkillCall {
                                skill_name: name.to_string(),
                                parameters: resolved,
                                result: None,
                                error: Some(interrupt.message().to_string()),
                                timestamp: Utc::now(),
                            });
                            return Err(interrupt);
                        }
                    }
                }
            },
        };

        let (record, content) = match outcome {
            Ok((resolved, result)) => {
                let content = result.to_string();
                let record = SkillCall {
                    skill_name: name.to_string(),
                    parameters: resolved,
                    result: Some(result),
                    error: None,
                    timestamp: Utc::now(),
                };
                (record, content)
            }
            Err(message) => {
                warn!("Skill {name} failed: {message}");
                let content = json!({ "error": message }).to_string();
                let record = SkillCall {
                    skill_name: name.to_string(),
                    parameters,
                    result: None,
                    error: Some(message),
                    timestamp: Utc::now(),
                };
                (record, content)
            }
        };

        state.skill_calls.push(record);
        state
            .transcript
            .push(Message::tool_result(call.id.clone(), content));
        Ok(())
    }
}

/// Loop-local state of one `chat` call.
struct ChatState {
    iteration: u32,
    transcript: Vec<Message>,
    skill_calls: Vec<SkillCall>,
}

/// Why a suspension point was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    Timeout,
}

impl Interrupt {
    fn message(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Timeout => "deadline exceeded",
        }
    }

    fn into_error(self, skill_calls: Vec<SkillCall>) -> AgentError {
        warn!("Chat {}", self.message());
        match self {
            Self::Cancelled => AgentError::Cancelled { skill_calls },
            Self::Timeout => AgentError::Timeout { skill_calls },
        }
    }
}

/// Races each suspension point against cancellation and the deadline.
struct Guard<'a> {
    cancel: &'a CancellationToken,
    deadline: Option<Instant>,
}

impl Guard<'_> {
    async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupt> {
        let expired = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            _ = expired => Err(Interrupt::Timeout),
            output = fut => Ok(output),
        }
    }
}

/// Some servers omit the call id; tool results must still be pairable.
fn with_call_id(mut call: ToolCall) -> ToolCall {
    if call.id.is_empty() {
        call.id = format!("call_{}", Uuid::new_v4().simple());
    }
    call
}

/// Normalizes a `/models` body: OpenAI `{data: [{id}]}` or a bare array of
/// `{id}` / `{name}` entries.
pub fn parse_models(body: &Value) -> Vec<ModelInfo> {
    if let Some(data) = body.get("data").and_then(Value::as_array) {
        return data
            .iter()
            .filter_map(|m| m.get("id").and_then(Value::as_str))
            .map(|id| ModelInfo {
                id: id.to_string(),
                name: id.to_string(),
            })
            .collect();
    }

    let Some(list) = body.as_array() else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|m| {
            let id = m.get("id").and_then(Value::as_str);
            let name = m.get("name").and_then(Value::as_str);
            let id = id.or(name)?;
            Some(ModelInfo {
                id: id.to_string(),
                name: name.unwrap_or(id).to_string(),
            })
        })
        .collect()
}
