//! Strongly-typed tool catalog.
//!
//! [`ToolSchema::build`] turns a decoded [`ConfigRecord`] into the catalog the
//! rest of the server works with. Every structural check happens here, once,
//! so a tool that reaches the registry is known to be well-formed.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::constraint::{Constraint, NumericCheck};
use super::error::SchemaError;
use super::record::{ConfigRecord, ModuleInfo, RawParameterSpec, RawToolDefinition};

/// Embedding field used by vector search when a tool does not name one.
pub const DEFAULT_VECTOR_PATH: &str = "embedding";

/// Field path searched by keyword search when a tool does not name any.
pub const WILDCARD_PATH: &str = "*";

// ============================================================================
// Parameter Types
// ============================================================================

/// The fixed set of parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Object,
}

impl ParamType {
    /// Parse a stored type name. Common aliases are accepted.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Some(Self::String),
            "integer" | "int" => Some(Self::Integer),
            "float" | "number" | "double" => Some(Self::Float),
            "boolean" | "bool" => Some(Self::Boolean),
            "list" | "array" => Some(Self::List),
            "object" | "dict" | "map" => Some(Self::Object),
            _ => None,
        }
    }

    /// Canonical type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Object => "object",
        }
    }

    /// JSON Schema type name.
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
            Self::List => "array",
            Self::Object => "object",
        }
    }

    /// Whether a JSON value has exactly this type, without coercion.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Whether numeric bounds apply to this type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Whether length bounds apply to this type.
    pub fn has_length(&self) -> bool {
        matches!(self, Self::String | Self::List)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub default: Option<Value>,
    pub constraint: Constraint,
    pub description: String,
    /// Listed in the tool's `required` set.
    pub required: bool,
}

impl ParamSpec {
    /// Whether a caller must supply this parameter.
    pub fn must_supply(&self) -> bool {
        self.required && self.default.is_none()
    }
}

// ============================================================================
// Tool Kinds
// ============================================================================

/// How a tool's invocation is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    VectorSearch,
    TextSearch,
    DistinctValues,
    #[serde(rename = "aggregate")]
    RawAggregation,
    CollectionInfo,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VectorSearch => "vector_search",
            Self::TextSearch => "text_search",
            Self::DistinctValues => "distinct_values",
            Self::RawAggregation => "aggregate",
            Self::CollectionInfo => "collection_info",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "vector_search" | "vector" => Some(Self::VectorSearch),
            "text_search" | "text" | "search" => Some(Self::TextSearch),
            "distinct_values" | "distinct" | "unique_values" => Some(Self::DistinctValues),
            "aggregate" | "aggregation" | "raw_aggregation" => Some(Self::RawAggregation),
            "collection_info" | "info" => Some(Self::CollectionInfo),
            _ => None,
        }
    }

    /// Whether this kind runs against a search or vector index.
    pub fn needs_index(&self) -> bool {
        matches!(self, Self::VectorSearch | Self::TextSearch)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Projection
// ============================================================================

/// A field inclusion or exclusion map.
///
/// Either every field is included (`1`/`true`) or every field is excluded
/// (`0`/`false`); `_id` may be excluded from an inclusion projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Projection(Map<String, Value>);

impl Projection {
    fn build(tool: &str, fields: &Map<String, Value>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::invalid_tool(tool, "projection is empty"));
        }

        let mut included = 0;
        let mut excluded = 0;
        let mut normalized = Map::with_capacity(fields.len());

        for (path, flag) in fields {
            if path.is_empty() || path.starts_with('$') {
                return Err(SchemaError::invalid_tool(
                    tool,
                    format!("projection field '{}' is not a field path", path),
                ));
            }
            let include = match flag {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                other => {
                    return Err(SchemaError::invalid_tool(
                        tool,
                        format!("projection field '{}' must be 0/1 or a boolean, got {}", path, other),
                    ));
                }
            };
            if include {
                included += 1;
            } else if path != "_id" {
                excluded += 1;
            }
            normalized.insert(path.clone(), Value::from(i32::from(include)));
        }

        if included > 0 && excluded > 0 {
            return Err(SchemaError::invalid_tool(
                tool,
                "projection mixes included and excluded fields",
            ));
        }
        Ok(Self(normalized))
    }

    /// Whether this projection lists fields to keep.
    pub fn is_inclusion(&self) -> bool {
        self.0.values().any(|v| v.as_i64() == Some(1))
    }

    /// Whether `path` is mentioned.
    pub fn mentions(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// The projection as a `$project` stage body.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Apply the projection to a returned document.
    pub fn apply(&self, document: Value) -> Value {
        let Value::Object(doc) = document else {
            return document;
        };

        if self.is_inclusion() {
            let mut out = Map::new();
            let keep_id = self.0.get("_id").and_then(Value::as_i64) != Some(0);
            if keep_id {
                if let Some(id) = doc.get("_id") {
                    out.insert("_id".to_string(), id.clone());
                }
            }
            for (path, flag) in &self.0 {
                if path == "_id" || flag.as_i64() != Some(1) {
                    continue;
                }
                if let Some(value) = lookup_path(&doc, path) {
                    insert_path(&mut out, path, value.clone());
                }
            }
            Value::Object(out)
        } else {
            let mut out = doc;
            for path in self.0.keys() {
                remove_path(&mut out, path);
            }
            Value::Object(out)
        }
    }
}

fn lookup_path<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn insert_path(doc: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

fn remove_path(doc: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = doc.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// A validated tool definition with its kind decided.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub returns: Option<String>,
    pub kind: ToolKind,
    pub parameters: IndexMap<String, ParamSpec>,
    pub index: Option<String>,
    pub projection: Option<Projection>,
    pub vector_path: String,
    pub fields_searched: Vec<String>,
}

impl ToolDefinition {
    /// Look up a declared parameter.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.get(name)
    }

    /// Names listed in `required`, in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .values()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// Description published to clients, with the `Returns:` section appended.
    pub fn rendered_description(&self) -> String {
        match self.returns.as_deref().map(str::trim) {
            Some(returns) if !returns.is_empty() => {
                format!("{}\n\nReturns:\n    {}", self.description.trim_end(), returns)
            }
            _ => self.description.clone(),
        }
    }

    fn build(name: &str, raw: &RawToolDefinition) -> Result<Self, SchemaError> {
        check_tool_name(name)?;

        if raw.description.trim().is_empty() {
            return Err(SchemaError::invalid_tool(name, "description is empty"));
        }

        for required in &raw.required {
            if !raw.parameters.contains_key(required) {
                return Err(SchemaError::invalid_tool(
                    name,
                    format!("required parameter '{}' is not declared in parameters", required),
                ));
            }
        }

        let mut parameters = IndexMap::with_capacity(raw.parameters.len());
        for (param_name, spec) in &raw.parameters {
            let required = raw.required.iter().any(|r| r == param_name);
            let param = build_param(name, param_name, spec, required)?;
            parameters.insert(param_name.clone(), param);
        }

        let index = match raw.index.as_deref().map(str::trim) {
            Some("") => return Err(SchemaError::invalid_tool(name, "index name is empty")),
            Some(index) => Some(index.to_string()),
            None => None,
        };

        let kind = match raw.kind.as_deref() {
            Some(declared) => ToolKind::parse(declared).ok_or_else(|| {
                SchemaError::invalid_tool(name, format!("unknown tool kind '{}'", declared))
            })?,
            None => {
                let vector_marked = raw.vector_path.is_some() || name == "vector_search";
                infer_kind(name, index.is_some(), vector_marked, &parameters)?
            }
        };
        check_shape(name, kind, index.is_some(), &parameters)?;

        let projection = raw
            .projection
            .as_ref()
            .map(|fields| Projection::build(name, fields))
            .transpose()?;

        let vector_path = match raw.vector_path.as_deref().map(str::trim) {
            Some("") => return Err(SchemaError::invalid_tool(name, "vector_path is empty")),
            Some(path) => path.to_string(),
            None => DEFAULT_VECTOR_PATH.to_string(),
        };

        let fields_searched = match &raw.fields_searched {
            Some(fields) if fields.iter().any(|f| f.trim().is_empty()) => {
                return Err(SchemaError::invalid_tool(name, "fields_searched has an empty path"));
            }
            Some(fields) if !fields.is_empty() => fields.clone(),
            _ => vec![WILDCARD_PATH.to_string()],
        };

        debug!(tool = %name, kind = %kind, "Built tool definition");

        Ok(Self {
            name: name.to_string(),
            description: raw.description.clone(),
            returns: raw.returns.clone(),
            kind,
            parameters,
            index,
            projection,
            vector_path,
            fields_searched,
        })
    }
}

fn check_tool_name(name: &str) -> Result<(), SchemaError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::invalid_tool(
            name,
            "tool names must be 1-64 characters of [A-Za-z0-9_-]",
        ))
    }
}

fn build_param(
    tool: &str,
    name: &str,
    spec: &RawParameterSpec,
    required: bool,
) -> Result<ParamSpec, SchemaError> {
    let param_type = ParamType::parse(&spec.type_name).ok_or_else(|| {
        SchemaError::invalid_tool(
            tool,
            format!("parameter '{}' has unsupported type '{}'", name, spec.type_name),
        )
    })?;

    let constraint = match &spec.constraints {
        Some(raw) => Constraint::from_raw(raw).map_err(|reason| {
            SchemaError::invalid_tool(tool, format!("parameter '{}': {}", name, reason))
        })?,
        None => Constraint::default(),
    };

    if constraint.has_numeric_bounds() && !param_type.is_numeric() {
        return Err(SchemaError::invalid_tool(
            tool,
            format!("parameter '{}' is {} but has numeric bounds", name, param_type),
        ));
    }
    if constraint.has_length_bounds() && !param_type.has_length() {
        return Err(SchemaError::invalid_tool(
            tool,
            format!("parameter '{}' is {} but has length bounds", name, param_type),
        ));
    }

    // A null default is the same as no default.
    let default = spec.default.clone().filter(|v| !v.is_null());
    if let Some(value) = &default {
        check_default(tool, name, param_type, &constraint, value)?;
    }

    Ok(ParamSpec {
        name: name.to_string(),
        param_type,
        default,
        constraint,
        description: spec.description.clone(),
        required,
    })
}

fn check_default(
    tool: &str,
    name: &str,
    param_type: ParamType,
    constraint: &Constraint,
    value: &Value,
) -> Result<(), SchemaError> {
    if !param_type.accepts(value) {
        return Err(SchemaError::invalid_tool(
            tool,
            format!("default for '{}' is not of type {}", name, param_type),
        ));
    }

    if let Some(n) = value.as_f64() {
        if constraint.check_number(n) != NumericCheck::Within {
            return Err(SchemaError::invalid_tool(
                tool,
                format!("default for '{}' does not satisfy '{}'", name, constraint),
            ));
        }
    }

    let len = match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    };
    if let Some(len) = len {
        constraint.check_length(len).map_err(|reason| {
            SchemaError::invalid_tool(tool, format!("default for '{}': {}", name, reason))
        })?;
    }
    Ok(())
}

fn infer_kind(
    tool: &str,
    has_index: bool,
    vector_marked: bool,
    parameters: &IndexMap<String, ParamSpec>,
) -> Result<ToolKind, SchemaError> {
    if parameters.contains_key("pipeline") {
        if has_index {
            return Err(SchemaError::invalid_tool(
                tool,
                "ambiguous shape: a 'pipeline' parameter together with an index; set 'kind' explicitly",
            ));
        }
        return Ok(ToolKind::RawAggregation);
    }

    if has_index {
        return Ok(if vector_marked || parameters.contains_key("num_candidates") {
            ToolKind::VectorSearch
        } else {
            ToolKind::TextSearch
        });
    }

    if parameters.is_empty() {
        return Ok(ToolKind::CollectionInfo);
    }
    if parameters.len() == 1 && parameters.contains_key("field") {
        return Ok(ToolKind::DistinctValues);
    }

    Err(SchemaError::invalid_tool(
        tool,
        "cannot determine the tool kind from its shape; declare an index, a 'field' or 'pipeline' parameter, or set 'kind'",
    ))
}

fn check_shape(
    tool: &str,
    kind: ToolKind,
    has_index: bool,
    parameters: &IndexMap<String, ParamSpec>,
) -> Result<(), SchemaError> {
    if kind.needs_index() && !has_index {
        return Err(SchemaError::invalid_tool(
            tool,
            format!("{} tools need an index", kind),
        ));
    }

    let needed = match kind {
        ToolKind::VectorSearch | ToolKind::TextSearch => Some("query_text"),
        ToolKind::DistinctValues => Some("field"),
        ToolKind::RawAggregation => Some("pipeline"),
        ToolKind::CollectionInfo => None,
    };
    if let Some(needed) = needed {
        if !parameters.contains_key(needed) {
            return Err(SchemaError::invalid_tool(
                tool,
                format!("{} tools need a '{}' parameter", kind, needed),
            ));
        }
    }

    if kind == ToolKind::CollectionInfo && !parameters.is_empty() {
        return Err(SchemaError::invalid_tool(
            tool,
            "collection_info tools take no parameters",
        ));
    }

    let expected = [
        ("query_text", ParamType::String),
        ("field", ParamType::String),
        ("limit", ParamType::Integer),
        ("num_candidates", ParamType::Integer),
        ("filters", ParamType::List),
        ("pipeline", ParamType::List),
    ];
    for (param, expected_type) in expected {
        if let Some(spec) = parameters.get(param) {
            if spec.param_type != expected_type {
                return Err(SchemaError::invalid_tool(
                    tool,
                    format!(
                        "parameter '{}' must be {}, not {}",
                        param, expected_type, spec.param_type
                    ),
                ));
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tool Schema
// ============================================================================

/// The immutable catalog loaded from one configuration record.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    name: String,
    module: ModuleInfo,
    tools: IndexMap<String, ToolDefinition>,
}

impl ToolSchema {
    /// Validate a record and build the catalog.
    ///
    /// Fails on the first tool that violates an invariant.
    pub fn build(record: &ConfigRecord) -> Result<Self, SchemaError> {
        let module = &record.module_info;
        if module.database.trim().is_empty() {
            return Err(SchemaError::invalid_module("database name is empty"));
        }
        if module.collection.trim().is_empty() {
            return Err(SchemaError::invalid_module("collection name is empty"));
        }

        let tools = record
            .tools
            .iter()
            .map(|(name, raw)| Ok((name.clone(), ToolDefinition::build(name, raw)?)))
            .collect::<Result<IndexMap<_, _>, SchemaError>>()?;

        Ok(Self {
            name: record.name.clone(),
            module: module.clone(),
            tools,
        })
    }

    /// Decode and build in one step.
    pub fn from_document(document: Value) -> Result<Self, SchemaError> {
        Self::build(&ConfigRecord::from_document(document)?)
    }

    /// Name of the configuration record this catalog came from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    pub fn get(&self, tool: &str) -> Option<&ToolDefinition> {
        self.tools.get(tool)
    }

    /// Tools in declaration order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
