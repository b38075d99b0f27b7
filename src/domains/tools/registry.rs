//! Tool Registry - the loaded catalog as callable tools.
//!
//! This module provides:
//! - The set of exposed tools, fixed at construction
//! - Tool metadata (name, description, input schema) for listing
//! - Invocation: validate, embed, compile, execute
//! - HTTP dispatch for tool calls (when http feature is enabled)

use std::sync::Arc;
use std::time::Duration;

use rmcp::model::{JsonObject, Tool};
use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

use super::compiler::compile;
use super::error::{ToolError, ValidationError};
use super::executor::{Executor, HealthReport, ResultSet};
use super::validator::validate;
use crate::core::config::ExecutionConfig;
use crate::domains::catalog::{ParamType, ToolDefinition, ToolKind, ToolSchema};
use crate::domains::embedding::{Embedder, EmbeddingError};

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - every exposed tool of one catalog.
///
/// Built once at startup from an immutable [`ToolSchema`]; tools cannot be
/// added or removed afterwards. Shared across concurrent invocations without
/// locking.
pub struct ToolRegistry {
    schema: Arc<ToolSchema>,
    executor: Executor,
    embedder: Option<Arc<dyn Embedder>>,
    timeout: Duration,
    exposed: Vec<String>,
}

impl ToolRegistry {
    /// Create a registry over a loaded catalog.
    ///
    /// Raw aggregation tools are only exposed when the configuration allows
    /// them.
    pub fn new(
        schema: Arc<ToolSchema>,
        executor: Executor,
        embedder: Option<Arc<dyn Embedder>>,
        options: &ExecutionConfig,
    ) -> Self {
        let mut exposed = Vec::with_capacity(schema.len());
        for tool in schema.tools() {
            if tool.kind == ToolKind::RawAggregation && !options.allow_raw_aggregation {
                warn!(
                    "Skipping raw aggregation tool '{}' (set MCP_ALLOW_RAW_AGGREGATION=true to expose it)",
                    tool.name
                );
                continue;
            }
            if tool.kind == ToolKind::VectorSearch && embedder.is_none() {
                warn!(
                    "Vector search tool '{}' is exposed but no embedding provider is configured",
                    tool.name
                );
            }
            exposed.push(tool.name.clone());
        }

        info!(
            "Registered {} of {} tools from catalog '{}'",
            exposed.len(),
            schema.len(),
            schema.name()
        );

        Self {
            schema,
            executor,
            embedder,
            timeout: Duration::from_secs(options.invocation_timeout_secs),
            exposed,
        }
    }

    pub fn schema(&self) -> &Arc<ToolSchema> {
        &self.schema
    }

    /// Get all exposed tool names, in catalog order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.exposed.iter().map(String::as_str).collect()
    }

    /// An exposed tool definition.
    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        if self.exposed.iter().any(|n| n == name) {
            self.schema.get(name)
        } else {
            None
        }
    }

    /// Get all exposed tools as Tool models (metadata).
    ///
    /// Both HTTP and STDIO/TCP transports list tools from here.
    pub fn get_all_tools(&self) -> Vec<Tool> {
        self.exposed
            .iter()
            .filter_map(|name| self.schema.get(name))
            .map(to_tool)
            .collect()
    }

    /// Check database reachability.
    pub async fn health(&self) -> HealthReport {
        self.executor.health().await
    }

    /// Invoke a tool: validate, embed the query when needed, compile, execute.
    ///
    /// Nothing reaches the database unless validation succeeds.
    #[instrument(skip(self, arguments), fields(tool = %name))]
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ResultSet, ToolError> {
        let tool = self
            .definition(name)
            .ok_or_else(|| ToolError::not_found(name))?;

        let args = validate(tool, arguments)
            .inspect_err(|e| warn!("Rejected arguments for '{}': {}", name, e))?;

        let query_vector = match tool.kind {
            ToolKind::VectorSearch => {
                let text = args
                    .str("query_text")
                    .ok_or_else(|| ValidationError::missing_required("query_text"))?;
                let embedder = self.embedder.as_ref().ok_or(EmbeddingError::NotConfigured)?;
                Some(embedder.embed(text).await?)
            }
            _ => None,
        };

        let operation = compile(tool, &args, query_vector)?;
        let result = self
            .executor
            .execute(operation, tool.projection.as_ref())
            .await
            .inspect_err(|e| warn!("Tool '{}' failed: {}", name, e))?;

        info!("Tool '{}' returned {} results", name, result.count);
        Ok(result)
    }

    /// Invoke with the configured deadline. Expiry drops the in-flight call.
    pub async fn invoke_with_deadline(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ResultSet, ToolError> {
        match tokio::time::timeout(self.timeout, self.invoke(name, arguments)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Tool '{}' timed out after {:?}", name, self.timeout);
                Err(ToolError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    /// Dispatch an HTTP tool call.
    ///
    /// Unknown tools and malformed argument envelopes are JSON-RPC errors;
    /// everything else is a tool result.
    #[cfg(feature = "http")]
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, String> {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(format!("Tool arguments must be an object, got {}", other)),
        };

        if self.definition(name).is_none() {
            warn!("Unknown tool requested: {}", name);
            return Err(format!("Unknown tool: {}", name));
        }

        let outcome = self.invoke_with_deadline(name, &arguments).await;
        Ok(super::handlers::call_result_json(&super::handlers::to_call_result(&outcome)))
    }
}

/// Tool model (metadata) for one definition.
pub fn to_tool(tool: &ToolDefinition) -> Tool {
    Tool {
        name: tool.name.clone().into(),
        description: Some(tool.rendered_description().into()),
        input_schema: Arc::new(input_schema(tool)),
        annotations: None,
        output_schema: None,
        icons: None,
        meta: None,
        title: None,
    }
}

/// JSON Schema of a tool's parameters, for client-side discovery.
pub fn input_schema(tool: &ToolDefinition) -> JsonObject {
    let mut properties = Map::new();
    for param in tool.parameters.values() {
        let mut property = Map::new();
        property.insert("type".into(), json!(param.param_type.json_type()));
        if !param.description.is_empty() {
            property.insert("description".into(), json!(param.description));
        }
        if let Some(default) = &param.default {
            property.insert("default".into(), default.clone());
        }

        let c = &param.constraint;
        if let Some(min) = c.min {
            property.insert("minimum".into(), number(min));
        }
        if let Some(max) = c.max {
            property.insert("maximum".into(), number(max));
        }
        let (min_key, max_key) = match param.param_type {
            ParamType::List => ("minItems", "maxItems"),
            _ => ("minLength", "maxLength"),
        };
        if let Some(min) = c.min_length {
            property.insert(min_key.into(), json!(min));
        }
        if let Some(max) = c.max_length {
            property.insert(max_key.into(), json!(max));
        }

        properties.insert(param.name.clone(), Value::Object(property));
    }

    let required: Vec<&str> = tool
        .parameters
        .values()
        .filter(|p| p.must_supply())
        .map(|p| p.name.as_str())
        .collect();

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    schema.insert("additionalProperties".into(), json!(false));
    schema
}

/// Whole bounds render as integers.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::catalog::fixtures;
    use crate::domains::embedding::testing::FixedEmbedder;
    use crate::domains::store::CollectionRef;
    use crate::domains::store::testing::{Call, RecordingStore};

    fn options(allow_raw: bool) -> ExecutionConfig {
        ExecutionConfig {
            allow_raw_aggregation: allow_raw,
            invocation_timeout_secs: 5,
            ..Default::default()
        }
    }

    fn registry_with(
        store: Arc<RecordingStore>,
        embedder: Option<Arc<FixedEmbedder>>,
        options: &ExecutionConfig,
    ) -> ToolRegistry {
        let schema = Arc::new(fixtures::sample_schema());
        let executor = Executor::new(
            store,
            CollectionRef::from(schema.module()),
            options.max_results,
        );
        let embedder = embedder.map(|e| e as Arc<dyn Embedder>);
        ToolRegistry::new(schema, executor, embedder, options)
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_registry_tool_names() {
        let registry = registry_with(Arc::new(RecordingStore::new()), None, &options(false));
        assert_eq!(
            registry.tool_names(),
            vec!["vector_search", "text_search", "get_unique_values", "collection_info"]
        );
        assert!(registry.definition("aggregate_query").is_none());

        let registry = registry_with(Arc::new(RecordingStore::new()), None, &options(true));
        assert_eq!(registry.tool_names().len(), 5);
        assert!(registry.definition("aggregate_query").is_some());
    }

    #[test]
    fn test_input_schema() {
        let schema = fixtures::sample_schema();
        let input = input_schema(schema.get("vector_search").unwrap());

        assert_eq!(input["type"], json!("object"));
        assert_eq!(input["required"], json!(["query_text"]));
        assert_eq!(input["additionalProperties"], json!(false));

        let props = &input["properties"];
        assert_eq!(props["query_text"]["type"], json!("string"));
        assert_eq!(props["query_text"]["minLength"], json!(1));
        assert_eq!(props["limit"]["type"], json!("integer"));
        assert_eq!(props["limit"]["default"], json!(10));
        assert_eq!(props["limit"]["maximum"], json!(50));
        assert_eq!(props["filters"]["type"], json!("array"));
        assert!(props["filters"].get("default").is_none());

        let info = input_schema(schema.get("collection_info").unwrap());
        assert!(info.get("required").is_none());
        assert_eq!(info["properties"], json!({}));
    }

    #[test]
    fn test_tool_metadata() {
        let registry = registry_with(Arc::new(RecordingStore::new()), None, &options(false));
        let tools = registry.get_all_tools();

        assert_eq!(tools.len(), 4);
        assert_eq!(tools[0].name, "vector_search");
        let description = tools[0].description.as_deref().unwrap();
        assert!(description.contains("Returns:"));
    }

    #[tokio::test]
    async fn test_invoke_vector_search() {
        let store = Arc::new(RecordingStore::new().with_documents(vec![json!({"name": "Loft", "score": 0.9})]));
        let embedder = Arc::new(FixedEmbedder::new(vec![0.1, 0.2, 0.3]));
        let registry = registry_with(store.clone(), Some(embedder.clone()), &options(false));

        let result = registry
            .invoke("vector_search", &args(json!({"query_text": "cozy apartment", "limit": 1000})))
            .await
            .unwrap();

        assert_eq!(result.count, 1);
        assert_eq!(embedder.inputs(), vec!["cozy apartment".to_string()]);

        let calls = store.calls();
        let Call::Aggregate { pipeline, .. } = &calls[0] else {
            panic!("expected an aggregation, got {:?}", calls);
        };
        assert_eq!(pipeline[0]["$vectorSearch"]["queryVector"], json!([0.1f32, 0.2f32, 0.3f32]));
        assert_eq!(pipeline[2], json!({"$limit": 50}));
    }

    #[tokio::test]
    async fn test_missing_required_makes_no_database_call() {
        let store = Arc::new(RecordingStore::new());
        let embedder = Arc::new(FixedEmbedder::new(vec![0.1]));
        let registry = registry_with(store.clone(), Some(embedder.clone()), &options(false));

        let err = registry
            .invoke("vector_search", &args(json!({"limit": 5})))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(err.reason(), Some("MissingRequired"));
        assert_eq!(err.parameter(), Some("query_text"));
        assert!(store.calls().is_empty());
        assert!(embedder.inputs().is_empty());
    }

    #[tokio::test]
    async fn test_vector_search_without_embedder() {
        let store = Arc::new(RecordingStore::new());
        let registry = registry_with(store.clone(), None, &options(false));

        let err = registry
            .invoke("vector_search", &args(json!({"query_text": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ExecutionError");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_gated_tools_are_not_found() {
        let registry = registry_with(Arc::new(RecordingStore::new()), None, &options(false));

        let err = registry.invoke("nope", &Map::new()).await.unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");

        let err = registry
            .invoke("aggregate_query", &args(json!({"pipeline": [{"$match": {}}]})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
    }

    #[tokio::test]
    async fn test_distinct_invocation() {
        let store = Arc::new(RecordingStore::new().with_distinct(vec![json!("Porto"), json!("Sydney")]));
        let registry = registry_with(store.clone(), None, &options(false));

        let result = registry
            .invoke("get_unique_values", &args(json!({"field": "address.market"})))
            .await
            .unwrap();

        assert_eq!(result.count, 2);
        assert_eq!(store.calls(), vec![Call::Distinct("address.market".into())]);
    }

    #[tokio::test]
    async fn test_deadline_expiry() {
        let store = Arc::new(RecordingStore::new().with_delay(Duration::from_secs(30)));
        let opts = ExecutionConfig {
            invocation_timeout_secs: 0,
            ..options(false)
        };
        let registry = registry_with(store, None, &opts);

        let err = registry
            .invoke_with_deadline("get_unique_values", &args(json!({"field": "beds"})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Timeout(0));
        assert_eq!(err.kind(), "ExecutionError");
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_registry_call_tool() {
        let store = Arc::new(RecordingStore::new().with_distinct(vec![json!(1)]));
        let registry = registry_with(store, None, &options(false));

        let result = registry
            .call_tool("get_unique_values", json!({"field": "beds"}))
            .await
            .unwrap();
        assert_eq!(result["isError"], json!(false));
        assert_eq!(result["structuredContent"]["count"], json!(1));

        let result = registry.call_tool("get_unique_values", json!({})).await.unwrap();
        assert_eq!(result["isError"], json!(true));
        assert_eq!(result["structuredContent"]["reason"], json!("MissingRequired"));

        assert!(registry.call_tool("unknown", json!({})).await.is_err());
    }
}
