pub mod builtin;
pub mod registry;
pub mod schema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use registry::SkillRegistry;
pub use schema::SkillArgs;

/// Primitive type tag of a skill parameter, as advertised to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// One declared parameter of a skill.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillParameter {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    /// Substituted by validation when the model omits the parameter.
    pub default: Option<Value>,
}

impl SkillParameter {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A capability the model can invoke via a tool call.
///
/// Arguments are validated against [`Skill::parameters`] by the scheduler
/// before `execute` runs, so implementations can rely on required
/// parameters being present with the declared type.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Unique identifier, used as the tool name sent to the model.
    /// Lowercase alphanumeric + underscores (e.g. "get_torrents").
    fn name(&self) -> &str;

    /// Human-readable description shown to the model so it knows
    /// when to invoke this skill.
    fn description(&self) -> &str;

    /// Ordered parameter declarations.
    fn parameters(&self) -> Vec<SkillParameter>;

    /// Executes the skill. The returned value is JSON-encoded and sent
    /// back to the model as the tool result.
    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_type_names() {
        assert_eq!(ParamType::String.as_str(), "string");
        assert_eq!(ParamType::Number.as_str(), "number");
        assert_eq!(ParamType::Boolean.as_str(), "boolean");
        assert_eq!(ParamType::Array.as_str(), "array");
        assert_eq!(ParamType::Object.as_str(), "object");
    }

    #[test]
    fn test_parameter_builders() {
        let p = SkillParameter::optional("limit", ParamType::Number, "Max results")
            .with_default(json!(20));
        assert!(!p.required);
        assert_eq!(p.default, Some(json!(20)));

        let p = SkillParameter::required("ids", ParamType::Array, "Torrent ids");
        assert!(p.required);
        assert!(p.default.is_none());
    }

    #[test]
    fn test_skill_is_object_safe() {
        fn _assert_object_safe(_: &dyn Skill) {}
    }
}
