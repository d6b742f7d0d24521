//! Error types shared across the agent runtime.
//!
//! Call-level failures (`AgentError`) propagate to the caller of
//! `AgentScheduler::chat`. Per-tool failures (`ArgumentError`, skill
//! execution errors, unknown skills) never surface here: the scheduler
//! folds them into the transcript so the model can react.

use reqwest::StatusCode;
use thiserror::Error;

use crate::agent::SkillCall;

/// Failure talking to the chat-completions endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network failure, timeout, or malformed HTTP exchange.
    #[error("chat API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status code.
    #[error("chat API error ({status}): {body}")]
    Status { status: StatusCode, body: String },

    /// The response body was not the JSON shape we expect.
    #[error("failed to decode chat API response: {0}")]
    Decode(String),
}

/// Fatal outcome of a `chat` call.
///
/// Variants that end the loop after tools may already have run carry the
/// partial skill-call log, so the caller can show which side effects
/// happened before the failure.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model response contained no choices.
    #[error("No response from AI")]
    NoChoices,

    #[error("Max iterations ({max}) reached")]
    MaxIterations { max: u32, skill_calls: Vec<SkillCall> },

    #[error("chat cancelled")]
    Cancelled { skill_calls: Vec<SkillCall> },

    #[error("chat deadline exceeded")]
    Timeout { skill_calls: Vec<SkillCall> },
}

impl AgentError {
    /// Skill calls that completed before the loop gave up.
    ///
    /// Empty for errors raised before any tool ran.
    pub fn skill_calls(&self) -> &[SkillCall] {
        match self {
            Self::MaxIterations { skill_calls, .. }
            | Self::Cancelled { skill_calls }
            | Self::Timeout { skill_calls } => skill_calls,
            Self::Llm(_) | Self::NoChoices => &[],
        }
    }
}

/// Tool-call arguments that do not satisfy the skill's declared parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    #[error("invalid arguments JSON: {0}")]
    InvalidJson(String),

    #[error("arguments must be a JSON object")]
    NotAnObject,

    #[error("Missing required parameter: {0}")]
    Missing(String),

    #[error("parameter '{name}' must be of type {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Registration rejected by the skill registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("skill name must not be empty")]
    EmptyName,

    #[error("skill '{0}' is already registered")]
    Duplicate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_iterations_message() {
        let err = AgentError::MaxIterations {
            max: 5,
            skill_calls: vec![],
        };
        assert_eq!(err.to_string(), "Max iterations (5) reached");
    }

    #[test]
    fn test_skill_calls_empty_for_protocol_error() {
        assert!(AgentError::NoChoices.skill_calls().is_empty());
    }

    #[test]
    fn test_missing_parameter_names_parameter() {
        let err = ArgumentError::Missing("ids".to_string());
        assert!(err.to_string().contains("ids"));
    }

    #[test]
    fn test_status_error_includes_body() {
        let err = LlmError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "invalid key".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("invalid key"));
    }
}
