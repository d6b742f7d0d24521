//! Skill registry: the set of capabilities advertised to the model.
//!
//! Skills are kept in registration order with a name index for dispatch.
//! Registering a name twice is a configuration error, not an overwrite.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;

use super::Skill;
use crate::error::RegistryError;
use crate::llm::ToolDefinition;

#[derive(Default)]
pub struct SkillRegistry {
    skills: Vec<Arc<dyn Skill>>,
    index: HashMap<String, usize>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a skill. Rejects empty and duplicate names.
    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Result<(), RegistryError> {
        let name = skill.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.index.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        debug!("Registered skill: {name}");
        self.index.insert(name, self.skills.len());
        self.skills.push(skill);
        Ok(())
    }

    /// Registers each skill in order, stopping at the first rejection.
    /// Skills accepted before the failure stay registered.
    pub fn register_batch(
        &mut self,
        skills: impl IntoIterator<Item = Arc<dyn Skill>>,
    ) -> Result<(), RegistryError> {
        for skill in skills {
            self.register(skill)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Skill>> {
        self.index.get(name).map(|&i| &self.skills[i])
    }

    /// Registered skills in insertion order.
    pub fn list(&self) -> &[Arc<dyn Skill>] {
        &self.skills
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Tool declarations in the chat API's `tools[]` format.
    pub fn to_tool_schema(&self) -> Vec<ToolDefinition> {
        self.skills.iter().map(|s| tool_definition(s.as_ref())).collect()
    }
}

/// Translates one skill into its `{type: "function", function: {...}}` declaration.
pub fn tool_definition(skill: &dyn Skill) -> ToolDefinition {
    let params = skill.parameters();

    let mut properties = Map::new();
    for p in &params {
        properties.insert(
            p.name.clone(),
            json!({
                "type": p.param_type.as_str(),
                "description": p.description,
            }),
        );
    }

    let required: Vec<Value> = params
        .iter()
        .filter(|p| p.required)
        .map(|p| Value::String(p.name.clone()))
        .collect();

    ToolDefinition::function(
        skill.name(),
        skill.description(),
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    )
}
