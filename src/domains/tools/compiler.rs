//! Query compilation.
//!
//! Each [`ToolKind`] has one strategy. Compilation only builds logical
//! pipeline stages; nothing here talks to the database.

use serde_json::{Map, Value, json};
use tracing::debug;

use super::error::{ToolError, ValidationError};
use super::validator::ValidatedArgs;
use crate::domains::catalog::{ToolDefinition, ToolKind};

/// Result count used when a search tool declares no `limit` parameter.
pub const DEFAULT_LIMIT: i64 = 10;

/// Candidate pool used when a vector tool receives no `num_candidates`.
pub const DEFAULT_NUM_CANDIDATES: i64 = 100;

/// A database operation ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledOperation {
    /// An aggregation pipeline.
    Pipeline {
        stages: Vec<Value>,
        /// Whether the tool's projection is already a stage.
        projection_embedded: bool,
    },

    /// Distinct values of a field path.
    Distinct { field: String },

    /// Collection statistics, indexes and a sample shape.
    CollectionInfo,
}

impl CompiledOperation {
    pub fn stages(&self) -> Option<&[Value]> {
        match self {
            Self::Pipeline { stages, .. } => Some(stages),
            _ => None,
        }
    }
}

/// Compile validated arguments into an operation.
///
/// `query_vector` must be supplied for vector search tools.
pub fn compile(
    tool: &ToolDefinition,
    args: &ValidatedArgs,
    query_vector: Option<Vec<f32>>,
) -> Result<CompiledOperation, ToolError> {
    let operation = match tool.kind {
        ToolKind::VectorSearch => compile_vector_search(tool, args, query_vector)?,
        ToolKind::TextSearch => compile_text_search(tool, args)?,
        ToolKind::DistinctValues => compile_distinct(args)?,
        ToolKind::RawAggregation => compile_raw_aggregation(args)?,
        ToolKind::CollectionInfo => CompiledOperation::CollectionInfo,
    };
    debug!(tool = %tool.name, operation = ?operation, "Compiled operation");
    Ok(operation)
}

fn compile_vector_search(
    tool: &ToolDefinition,
    args: &ValidatedArgs,
    query_vector: Option<Vec<f32>>,
) -> Result<CompiledOperation, ToolError> {
    let index = search_index(tool)?;
    let query_vector = query_vector
        .ok_or_else(|| ToolError::compilation(&tool.name, "no query vector was produced"))?;

    let limit = effective_limit(tool, args);
    let num_candidates = clamp_to_declared(
        tool,
        "num_candidates",
        args.integer("num_candidates").unwrap_or(DEFAULT_NUM_CANDIDATES),
    )
    .max(limit);

    let mut search = Map::new();
    search.insert("index".into(), json!(index));
    search.insert("path".into(), json!(tool.vector_path));
    search.insert("queryVector".into(), json!(query_vector));
    search.insert("numCandidates".into(), json!(num_candidates));
    search.insert("limit".into(), json!(limit));
    let filters = args.list("filters").filter(|f| !f.is_empty());
    if let Some(filter) = filters.map(build_filter).transpose()? {
        search.insert("filter".into(), filter);
    }

    let stages = vec![
        json!({ "$vectorSearch": search }),
        json!({ "$addFields": { "score": { "$meta": "vectorSearchScore" } } }),
        json!({ "$limit": limit }),
    ];
    Ok(with_projection(tool, stages))
}

fn compile_text_search(
    tool: &ToolDefinition,
    args: &ValidatedArgs,
) -> Result<CompiledOperation, ToolError> {
    let index = search_index(tool)?;
    let query = args
        .str("query_text")
        .ok_or_else(|| ValidationError::missing_required("query_text"))?;
    let limit = effective_limit(tool, args);

    let path = match tool.fields_searched.as_slice() {
        [single] if single == "*" => json!({ "wildcard": "*" }),
        [single] => json!(single),
        fields => json!(fields),
    };

    let stages = vec![
        json!({ "$search": { "index": index, "text": { "query": query, "path": path } } }),
        json!({ "$addFields": { "score": { "$meta": "searchScore" } } }),
        json!({ "$limit": limit }),
    ];
    Ok(with_projection(tool, stages))
}

fn compile_distinct(args: &ValidatedArgs) -> Result<CompiledOperation, ToolError> {
    let field = args
        .str("field")
        .ok_or_else(|| ValidationError::missing_required("field"))?
        .trim();

    let valid = !field.is_empty()
        && !field.starts_with('$')
        && field.split('.').all(|segment| !segment.is_empty());
    if !valid {
        return Err(ValidationError::type_mismatch(
            "field",
            format!("'{}' is not a field path", field),
        )
        .into());
    }

    Ok(CompiledOperation::Distinct {
        field: field.to_string(),
    })
}

fn compile_raw_aggregation(args: &ValidatedArgs) -> Result<CompiledOperation, ToolError> {
    let pipeline = args
        .list("pipeline")
        .ok_or_else(|| ValidationError::missing_required("pipeline"))?;

    if pipeline.is_empty() {
        return Err(ValidationError::type_mismatch("pipeline", "pipeline has no stages").into());
    }
    for (i, stage) in pipeline.iter().enumerate() {
        let well_formed = stage.as_object().is_some_and(|s| !s.is_empty());
        if !well_formed {
            return Err(ValidationError::type_mismatch(
                "pipeline",
                format!("stage {} is not a non-empty object", i),
            )
            .into());
        }
    }

    let mut stages = pipeline.to_vec();
    let ends_with_limit = stages
        .last()
        .and_then(Value::as_object)
        .is_some_and(|s| s.contains_key("$limit"));
    if let Some(limit) = args.integer("limit") {
        if !ends_with_limit {
            stages.push(json!({ "$limit": limit }));
        }
    }

    // Caller stages may reshape documents, so the projection runs afterwards.
    Ok(CompiledOperation::Pipeline {
        stages,
        projection_embedded: false,
    })
}

fn search_index(tool: &ToolDefinition) -> Result<&str, ToolError> {
    tool.index
        .as_deref()
        .ok_or_else(|| ToolError::compilation(&tool.name, format!("{} tools need an index", tool.kind)))
}

/// The requested limit, clamped to the declared maximum and to at least 1.
fn effective_limit(tool: &ToolDefinition, args: &ValidatedArgs) -> i64 {
    clamp_to_declared(tool, "limit", args.integer("limit").unwrap_or(DEFAULT_LIMIT)).max(1)
}

fn clamp_to_declared(tool: &ToolDefinition, param: &str, value: i64) -> i64 {
    match tool.param(param).and_then(|p| p.constraint.max) {
        Some(max) => value.min(max.floor() as i64),
        None => value,
    }
}

fn with_projection(tool: &ToolDefinition, mut stages: Vec<Value>) -> CompiledOperation {
    if let Some(projection) = &tool.projection {
        let mut fields = projection.as_map().clone();
        if projection.is_inclusion() && !projection.mentions("score") {
            fields.insert("score".into(), json!(1));
        }
        stages.push(json!({ "$project": fields }));
    }
    CompiledOperation::Pipeline {
        stages,
        projection_embedded: true,
    }
}

/// Build a `$vectorSearch` pre-filter from `[field, value]` pairs or
/// single-key objects. Several filters are ANDed.
fn build_filter(filters: &[Value]) -> Result<Value, ToolError> {
    let mut clauses = Vec::with_capacity(filters.len());
    for (i, filter) in filters.iter().enumerate() {
        let clause = match filter {
            Value::Array(pair) if pair.len() == 2 => match pair[0].as_str() {
                Some(field) if !field.is_empty() && !field.starts_with('$') => {
                    let mut clause = Map::new();
                    clause.insert(field.to_string(), pair[1].clone());
                    Value::Object(clause)
                }
                _ => return Err(bad_filter(i, "the first element must be a field path")),
            },
            Value::Object(map) if map.len() == 1 => Value::Object(map.clone()),
            _ => return Err(bad_filter(i, "expected a [field, value] pair")),
        };
        clauses.push(clause);
    }

    Ok(match clauses.len() {
        1 => clauses.remove(0),
        _ => json!({ "$and": clauses }),
    })
}

fn bad_filter(index: usize, detail: &str) -> ToolError {
    ValidationError::type_mismatch("filters", format!("filter {}: {}", index, detail)).into()
}
