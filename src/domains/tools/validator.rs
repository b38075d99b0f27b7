//! Parameter validation.
//!
//! Turns the raw argument map of a call into a [`ValidatedArgs`] set: every
//! value has its declared type, defaults are filled in, and constraints hold.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::error::ValidationError;
use crate::domains::catalog::{NumericCheck, ParamSpec, ParamType, ToolDefinition};

/// A type-checked argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<Value>),
    Object(Map<String, Value>),
}

impl ArgValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::from(s.as_str()),
            Self::Integer(n) => Value::from(*n),
            Self::Float(f) => Value::from(*f),
            Self::Boolean(b) => Value::from(*b),
            Self::List(items) => Value::Array(items.clone()),
            Self::Object(map) => Value::Object(map.clone()),
        }
    }
}

/// Arguments of one invocation after validation.
///
/// Parameters that were neither supplied nor defaulted are absent, never null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs(BTreeMap<String, ArgValue>);

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(ArgValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(ArgValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[Value]> {
        match self.0.get(name) {
            Some(ArgValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Validate raw call arguments against a tool definition.
///
/// Unknown names are rejected before anything else. A null value counts as
/// absent. Values above a numeric maximum are clamped to it; values below a
/// minimum are rejected.
pub fn validate(
    tool: &ToolDefinition,
    raw: &Map<String, Value>,
) -> Result<ValidatedArgs, ValidationError> {
    if let Some(unknown) = raw.keys().find(|k| !tool.parameters.contains_key(*k)) {
        return Err(ValidationError::unknown_parameter(unknown));
    }

    let mut args = BTreeMap::new();
    for (name, spec) in &tool.parameters {
        let supplied = raw.get(name).filter(|v| !v.is_null());
        let value = match (supplied, &spec.default) {
            (Some(value), _) => coerce(spec, value)?,
            (None, Some(default)) => coerce(spec, default)?,
            (None, None) if spec.required => return Err(ValidationError::missing_required(name)),
            (None, None) => continue,
        };
        args.insert(name.clone(), check_constraint(spec, value)?);
    }
    Ok(ValidatedArgs(args))
}

fn coerce(spec: &ParamSpec, value: &Value) -> Result<ArgValue, ValidationError> {
    let coerced = match spec.param_type {
        ParamType::String => value.as_str().map(|s| ArgValue::String(s.to_string())),
        ParamType::Integer => coerce_integer(value).map(ArgValue::Integer),
        ParamType::Float => coerce_float(value).map(ArgValue::Float),
        ParamType::Boolean => match value {
            Value::Bool(b) => Some(ArgValue::Boolean(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(ArgValue::Boolean(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(ArgValue::Boolean(false)),
            _ => None,
        },
        ParamType::List => match decode_embedded(value) {
            Value::Array(items) => Some(ArgValue::List(items)),
            _ => None,
        },
        ParamType::Object => match decode_embedded(value) {
            Value::Object(map) => Some(ArgValue::Object(map)),
            _ => None,
        },
    };

    coerced.ok_or_else(|| {
        ValidationError::type_mismatch(
            &spec.name,
            format!("expected {}, got {}", spec.param_type, describe(value)),
        )
    })
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<u64>().ok().map(|_| i64::MAX))
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

/// Whole floats saturate into the i64 range so out-of-range limits clamp later.
fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 {
        Some(f.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    } else {
        None
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// A list or object may arrive JSON-encoded in a string.
fn decode_embedded(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or(Value::Null),
        other => other.clone(),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn check_constraint(spec: &ParamSpec, value: ArgValue) -> Result<ArgValue, ValidationError> {
    let constraint = &spec.constraint;
    if constraint.is_empty() {
        return Ok(value);
    }

    let violation = |detail: String| {
        ValidationError::constraint_violation(&spec.name, constraint.to_string(), detail)
    };

    match value {
        ArgValue::Integer(n) => match constraint.check_number(n as f64) {
            NumericCheck::Within => Ok(ArgValue::Integer(n)),
            NumericCheck::AboveMax(max) => {
                debug!("Clamping '{}' from {} to {}", spec.name, n, max);
                Ok(ArgValue::Integer(max.floor() as i64))
            }
            NumericCheck::BelowMin(min) => Err(violation(format!("{} is below minimum {}", n, min))),
        },
        ArgValue::Float(f) => match constraint.check_number(f) {
            NumericCheck::Within => Ok(ArgValue::Float(f)),
            NumericCheck::AboveMax(max) => {
                debug!("Clamping '{}' from {} to {}", spec.name, f, max);
                Ok(ArgValue::Float(max))
            }
            NumericCheck::BelowMin(min) => Err(violation(format!("{} is below minimum {}", f, min))),
        },
        ArgValue::String(s) => {
            constraint.check_length(s.chars().count()).map_err(violation)?;
            Ok(ArgValue::String(s))
        }
        ArgValue::List(items) => {
            constraint.check_length(items.len()).map_err(violation)?;
            Ok(ArgValue::List(items))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::catalog::{ToolSchema, fixtures};
    use crate::domains::tools::ValidationErrorKind;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn vector_tool() -> ToolDefinition {
        fixtures::sample_schema().get("vector_search").unwrap().clone()
    }

    #[test]
    fn test_defaults_fill_absent_parameters() {
        let validated = validate(&vector_tool(), &args(json!({"query_text": "cozy apartment"}))).unwrap();

        assert_eq!(validated.str("query_text"), Some("cozy apartment"));
        assert_eq!(validated.integer("limit"), Some(10));
        assert_eq!(validated.integer("num_candidates"), Some(100));
        assert!(!validated.contains("filters"));
    }

    #[test]
    fn test_limit_above_maximum_is_clamped() {
        let validated = validate(
            &vector_tool(),
            &args(json!({"query_text": "cozy apartment", "limit": 1000})),
        )
        .unwrap();
        assert_eq!(validated.integer("limit"), Some(50));
    }

    #[test]
    fn test_huge_limits_saturate_then_clamp() {
        for limit in [json!(10000000000000000000u64), json!(1e16), json!("99999999999999999999")] {
            let validated = validate(&vector_tool(), &args(json!({"query_text": "x", "limit": limit}))).unwrap();
            assert_eq!(validated.integer("limit"), Some(50));
        }

        let err = validate(&vector_tool(), &args(json!({"query_text": "x", "limit": -1e19}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_limit_below_minimum_is_rejected() {
        let err = validate(&vector_tool(), &args(json!({"query_text": "x", "limit": 0}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::ConstraintViolation);
        assert_eq!(err.param, "limit");
        assert_eq!(err.constraint.as_deref(), Some("1 <= value <= 50"));
    }

    #[test]
    fn test_missing_required() {
        let err = validate(&vector_tool(), &args(json!({"limit": 5}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingRequired);
        assert_eq!(err.param, "query_text");
    }

    #[test]
    fn test_null_counts_as_absent() {
        let err = validate(&vector_tool(), &args(json!({"query_text": null}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingRequired);

        let validated = validate(&vector_tool(), &args(json!({"query_text": "x", "limit": null}))).unwrap();
        assert_eq!(validated.integer("limit"), Some(10));
    }

    #[test]
    fn test_unknown_parameter_is_rejected() {
        let err = validate(&vector_tool(), &args(json!({"query_text": "x", "lmit": 5}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::UnknownParameter);
        assert_eq!(err.param, "lmit");
    }

    #[test]
    fn test_type_mismatch() {
        let err = validate(&vector_tool(), &args(json!({"query_text": "x", "limit": "many"}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TypeMismatch);
        assert_eq!(err.param, "limit");

        let err = validate(&vector_tool(), &args(json!({"query_text": 42}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TypeMismatch);

        let err = validate(&vector_tool(), &args(json!({"query_text": "x", "limit": 2.5}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TypeMismatch);
    }

    #[test]
    fn test_lenient_coercion() {
        let validated = validate(
            &vector_tool(),
            &args(json!({
                "query_text": "x",
                "limit": "20",
                "num_candidates": 200.0,
                "filters": "[[\"address.market\", \"Porto\"]]"
            })),
        )
        .unwrap();

        assert_eq!(validated.integer("limit"), Some(20));
        assert_eq!(validated.integer("num_candidates"), Some(200));
        assert_eq!(validated.list("filters").unwrap(), &[json!(["address.market", "Porto"])]);
    }

    #[test]
    fn test_length_constraint() {
        let err = validate(&vector_tool(), &args(json!({"query_text": ""}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::ConstraintViolation);
        assert_eq!(err.param, "query_text");
    }

    #[test]
    fn test_scalar_types() {
        let schema = ToolSchema::from_document(json!({
            "name": "types",
            "module_info": {"database": "d", "collection": "c"},
            "tools": {"lookup": {
                "description": "lookup",
                "kind": "aggregate",
                "parameters": {
                    "pipeline": {"type": "list"},
                    "ratio": {"type": "float", "constraints": "0 <= value <= 1"},
                    "verbose": {"type": "boolean"},
                    "options": {"type": "object"}
                }
            }}
        }))
        .unwrap();
        let tool = schema.get("lookup").unwrap();

        let validated = validate(
            tool,
            &args(json!({"ratio": "1.5", "verbose": "TRUE", "options": "{\"a\": 1}"})),
        )
        .unwrap();
        assert_eq!(validated.get("ratio"), Some(&ArgValue::Float(1.0)));
        assert_eq!(validated.get("verbose"), Some(&ArgValue::Boolean(true)));
        assert_eq!(
            validated.get("options").map(ArgValue::to_json),
            Some(json!({"a": 1}))
        );

        let err = validate(tool, &args(json!({"verbose": "yes"}))).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TypeMismatch);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let tool = vector_tool();
        let raw = args(json!({"query_text": "cozy", "limit": 75, "filters": [["beds", 2]]}));

        let first = validate(&tool, &raw).unwrap();
        let second = validate(&tool, &raw).unwrap();
        assert_eq!(first, second);
    }
}
