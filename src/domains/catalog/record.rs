//! Configuration record as stored in the backing store.
//!
//! These types mirror the stored document one-to-one and are only a decoding
//! step: nothing here is trusted until [`ToolSchema::build`] has checked it.
//!
//! [`ToolSchema::build`]: super::ToolSchema::build

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::SchemaError;

/// A stored configuration record describing one tool catalog.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfigRecord {
    /// Unique record name (stored as `name` or `Name`).
    #[serde(alias = "Name")]
    pub name: String,

    /// Target database/collection and descriptive text.
    pub module_info: ModuleInfo,

    /// Tool name to tool definition, in declaration order.
    #[serde(default)]
    pub tools: IndexMap<String, RawToolDefinition>,
}

/// Module metadata: where the tools run and how the module describes itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModuleInfo {
    /// Target database name.
    pub database: String,

    /// Target collection name.
    pub collection: String,

    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Free-text module description, used as server instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A tool definition before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawToolDefinition {
    /// Free-text description shown to clients.
    #[serde(default)]
    pub description: String,

    /// Parameters that must be supplied or defaulted.
    #[serde(default)]
    pub required: Vec<String>,

    /// Parameter name to parameter spec, in declaration order.
    #[serde(default)]
    pub parameters: IndexMap<String, RawParameterSpec>,

    /// Free-text description of the output (documentation only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,

    /// Search or vector index the tool targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Field inclusion/exclusion map applied to results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Map<String, Value>>,

    /// Explicit tool kind, overriding shape inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Document field holding the embedding vector (vector search only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_path: Option<String>,

    /// Field paths searched by keyword search (text search only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_searched: Option<Vec<String>>,
}

/// A parameter spec before validation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawParameterSpec {
    /// Primitive type name (`string`, `integer`, `float`, `boolean`, `list`, `object`).
    #[serde(rename = "type")]
    pub type_name: String,

    /// Value used when the parameter is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Bounds, either as an expression (`"1 <= value <= 50"`) or as fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<RawConstraint>,

    /// Free-text description shown to clients.
    #[serde(default)]
    pub description: String,
}

/// Stored form of a parameter constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawConstraint {
    /// A small expression such as `"1 <= value <= 50"` or `"len >= 1"`.
    Expression(String),

    /// Explicit bound fields.
    Bounds(ConstraintBounds),
}

/// Explicit bound fields of a constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConstraintBounds {
    #[serde(default, alias = "ge", alias = "minimum", skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, alias = "le", alias = "maximum", skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, alias = "minLength", alias = "min_len", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, alias = "maxLength", alias = "max_len", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl ConfigRecord {
    /// Decode a record from a stored JSON document.
    ///
    /// Unknown fields (such as a database `_id`) are ignored.
    pub fn from_document(document: Value) -> Result<Self, SchemaError> {
        serde_json::from_value(document).map_err(|e| SchemaError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_accepts_capitalized_name() {
        let record = ConfigRecord::from_document(json!({
            "_id": {"$oid": "65f0c0ffee00000000000000"},
            "Name": "airbnb",
            "module_info": {"database": "sample_airbnb", "collection": "listingsAndReviews"},
            "tools": {}
        }))
        .unwrap();

        assert_eq!(record.name, "airbnb");
        assert_eq!(record.module_info.collection, "listingsAndReviews");
        assert!(record.tools.is_empty());
    }

    #[test]
    fn test_decode_keeps_tool_order() {
        let record = ConfigRecord::from_document(json!({
            "name": "ordered",
            "module_info": {"database": "db", "collection": "c"},
            "tools": {
                "zeta": {"description": "z"},
                "alpha": {"description": "a"},
                "mid": {"description": "m"}
            }
        }))
        .unwrap();

        let names: Vec<_> = record.tools.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_decode_constraint_forms() {
        let expr: RawConstraint = serde_json::from_value(json!("1 <= value <= 50")).unwrap();
        assert_eq!(expr, RawConstraint::Expression("1 <= value <= 50".to_string()));

        let bounds: RawConstraint = serde_json::from_value(json!({"ge": 1, "le": 50})).unwrap();
        assert_eq!(
            bounds,
            RawConstraint::Bounds(ConstraintBounds {
                min: Some(1.0),
                max: Some(50.0),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_decode_missing_module_info_fails() {
        let err = ConfigRecord::from_document(json!({"name": "broken"})).unwrap_err();
        assert!(matches!(err, SchemaError::Decode(_)));
    }
}
