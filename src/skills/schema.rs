//! Central validation of tool-call arguments against skill parameters.
//!
//! Models are sloppy with types: a single id instead of a list, `"5"`
//! instead of `5`. Validation applies a small set of lossless coercions
//! once, here, so every skill sees the declared shapes.

use anyhow::anyhow;
use serde_json::{Map, Value};

use super::{ParamType, SkillParameter};
use crate::error::ArgumentError;

/// Parses the JSON-encoded `arguments` string of a tool call.
///
/// An empty (or whitespace-only) string counts as `{}`.
pub fn parse_arguments(raw: &str) -> Result<Value, ArgumentError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(raw).map_err(|e| ArgumentError::InvalidJson(e.to_string()))
}

/// Validates parsed arguments against `params`, applying defaults and
/// coercions. Undeclared keys pass through untouched.
pub fn validate(params: &[SkillParameter], raw: Value) -> Result<SkillArgs, ArgumentError> {
    let mut values = match raw {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => return Err(ArgumentError::NotAnObject),
    };

    for param in params {
        let present = values.get(&param.name).is_some_and(|v| !v.is_null());
        if !present {
            values.remove(&param.name);
            if let Some(default) = &param.default {
                values.insert(param.name.clone(), default.clone());
            } else if param.required {
                return Err(ArgumentError::Missing(param.name.clone()));
            }
            continue;
        }

        if let Some(value) = values.remove(&param.name) {
            let coerced = coerce(param, value)?;
            values.insert(param.name.clone(), coerced);
        }
    }

    Ok(SkillArgs { values })
}

fn coerce(param: &SkillParameter, value: Value) -> Result<Value, ArgumentError> {
    let mismatch = |value: &Value| ArgumentError::WrongType {
        name: param.name.clone(),
        expected: param.param_type.as_str(),
        found: json_type_name(value),
    };

    match (param.param_type, value) {
        (ParamType::String, v @ Value::String(_)) => Ok(v),
        (ParamType::Number, v @ Value::Number(_)) => Ok(v),
        (ParamType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(number_value)
            .ok_or_else(|| mismatch(&Value::String(s))),
        (ParamType::Boolean, v @ Value::Bool(_)) => Ok(v),
        (ParamType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch(&Value::String(s))),
        },
        (ParamType::Array, v @ Value::Array(_)) => Ok(v),
        (ParamType::Array, v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
            Ok(Value::Array(vec![v]))
        }
        (ParamType::Object, v @ Value::Object(_)) => Ok(v),
        (_, v) => Err(mismatch(&v)),
    }
}

/// Integral values stay integers so `as_i64` keeps working downstream.
fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(Value::Number)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validated arguments handed to [`super::Skill::execute`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillArgs {
    values: Map<String, Value>,
}

impl SkillArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Like [`str`](Self::str) but fails when the value is absent or blank.
    pub fn require_str(&self, name: &str) -> anyhow::Result<&str> {
        self.str(name)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing required parameter: {name}"))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Integral view of a number parameter (fractions are truncated).
    pub fn int(&self, name: &str) -> Option<i64> {
        let value = self.get(name)?;
        value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn array(&self, name: &str) -> Option<&Vec<Value>> {
        self.get(name).and_then(Value::as_array)
    }

    /// Torrent ids from an array parameter. Numeric strings are accepted.
    pub fn ids(&self, name: &str) -> anyhow::Result<Vec<i64>> {
        let items = self
            .array(name)
            .ok_or_else(|| anyhow!("Missing required parameter: {name}"))?;
        items
            .iter()
            .map(|item| {
                let id = match item {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                };
                id.ok_or_else(|| anyhow!("Invalid torrent id in '{name}': {item}"))
            })
            .collect()
    }

    /// String items of an array parameter. Numbers are stringified.
    pub fn strings(&self, name: &str) -> anyhow::Result<Vec<String>> {
        let items = self
            .array(name)
            .ok_or_else(|| anyhow!("Missing required parameter: {name}"))?;
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(anyhow!("Invalid item in '{name}': {other}")),
            })
            .collect()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Vec<SkillParameter> {
        vec![
            SkillParameter::required("ids", ParamType::Array, "Torrent ids"),
            SkillParameter::optional("limit", ParamType::Number, "Max results")
                .with_default(json!(20)),
            SkillParameter::optional("paused", ParamType::Boolean, "Add paused"),
            SkillParameter::optional("keyword", ParamType::String, "Filter"),
        ]
    }

    // ── parse_arguments ──────────────────────────────────

    #[test]
    fn test_parse_empty_string_is_empty_object() {
        assert_eq!(parse_arguments("").unwrap(), json!({}));
        assert_eq!(parse_arguments("   ").unwrap(), json!({}));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_arguments("{ids: [1").unwrap_err();
        assert!(matches!(err, ArgumentError::InvalidJson(_)));
    }

    // ── validate ─────────────────────────────────────────

    #[test]
    fn test_defaults_applied() {
        let args = validate(&params(), json!({"ids": [1]})).unwrap();
        assert_eq!(args.int("limit"), Some(20));
        assert!(args.get("paused").is_none());
    }

    #[test]
    fn test_missing_required() {
        let err = validate(&params(), json!({"limit": 5})).unwrap_err();
        assert_eq!(err, ArgumentError::Missing("ids".to_string()));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = validate(&params(), json!({"ids": null})).unwrap_err();
        assert_eq!(err, ArgumentError::Missing("ids".to_string()));

        let args = validate(&params(), json!({"ids": [1], "limit": null})).unwrap();
        assert_eq!(args.int("limit"), Some(20));
    }

    #[test]
    fn test_scalar_wrapped_into_array() {
        let args = validate(&params(), json!({"ids": 7})).unwrap();
        assert_eq!(args.ids("ids").unwrap(), vec![7]);
    }

    #[test]
    fn test_numeric_string_coerced() {
        let args = validate(&params(), json!({"ids": [1], "limit": "5"})).unwrap();
        assert_eq!(args.get("limit"), Some(&json!(5)));
    }

    #[test]
    fn test_boolean_string_coerced() {
        let args = validate(&params(), json!({"ids": [1], "paused": "TRUE"})).unwrap();
        assert_eq!(args.bool("paused"), Some(true));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = validate(&params(), json!({"ids": [1], "keyword": 42})).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::WrongType {
                name: "keyword".to_string(),
                expected: "string",
                found: "number",
            }
        );

        let err = validate(&params(), json!({"ids": {"a": 1}})).unwrap_err();
        assert!(matches!(err, ArgumentError::WrongType { .. }));
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            validate(&params(), json!([1, 2])).unwrap_err(),
            ArgumentError::NotAnObject
        );
    }

    #[test]
    fn test_null_arguments_treated_as_empty() {
        let args = validate(&[], Value::Null).unwrap();
        assert_eq!(args.into_value(), json!({}));
    }

    #[test]
    fn test_undeclared_keys_pass_through() {
        let args = validate(&params(), json!({"ids": [1], "extra": "x"})).unwrap();
        assert_eq!(args.str("extra"), Some("x"));
    }

    // ── accessors ────────────────────────────────────────

    #[test]
    fn test_ids_accepts_numeric_strings() {
        let args = validate(&params(), json!({"ids": [1, "2", " 3 "]})).unwrap();
        assert_eq!(args.ids("ids").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_ids_rejects_garbage() {
        let args = validate(&params(), json!({"ids": ["abc"]})).unwrap();
        assert!(args.ids("ids").is_err());
    }

    #[test]
    fn test_strings() {
        let args = validate(&params(), json!({"ids": ["hd", 4]})).unwrap();
        assert_eq!(args.strings("ids").unwrap(), vec!["hd", "4"]);
    }

    #[test]
    fn test_require_str_blank() {
        let args = validate(&params(), json!({"ids": [1], "keyword": "  "})).unwrap();
        assert!(args.require_str("keyword").is_err());
    }

    #[test]
    fn test_int_truncates_fraction() {
        let args = validate(&params(), json!({"ids": [1], "limit": 7.9})).unwrap();
        assert_eq!(args.int("limit"), Some(7));
    }
}
