//! Resource service implementation.
//!
//! The ResourceService describes the loaded catalog: module metadata, the
//! exposed tools in `toolSpec` layout, and the record schema. Contents are
//! rendered on every read from the shared [`ToolRegistry`].

use std::sync::Arc;

use rmcp::model::{ReadResourceResult, Resource, ResourceContents, ResourceTemplate};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::error::ResourceError;
use super::registry::{CatalogResource, get_all_resource_templates, get_all_resources};
use crate::domains::catalog::{ConfigRecord, ToolDefinition};
use crate::domains::tools::{ToolRegistry, input_schema};

/// Service for listing and reading catalog resources.
pub struct ResourceService {
    registry: Arc<ToolRegistry>,
    resources: Vec<Resource>,
    templates: Vec<ResourceTemplate>,
}

impl ResourceService {
    /// Create a ResourceService over a tool registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        let resources = get_all_resources();
        let templates = get_all_resource_templates();
        info!(
            "Initializing ResourceService with {} resources and {} templates",
            resources.len(),
            templates.len()
        );

        Self {
            registry,
            resources,
            templates,
        }
    }

    /// List all available resources.
    pub async fn list_resources(&self) -> Vec<Resource> {
        self.resources.clone()
    }

    /// List all available resource templates.
    pub async fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.templates.clone()
    }

    /// Read a resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, ResourceError> {
        debug!("Reading resource: {}", uri);
        let resource = CatalogResource::from_uri(uri).ok_or_else(|| ResourceError::not_found(uri))?;

        let body = match resource {
            CatalogResource::Module => self.module_document(),
            CatalogResource::Tools => json!({
                "tools": self
                    .registry
                    .tool_names()
                    .into_iter()
                    .filter_map(|name| self.registry.definition(name))
                    .map(tool_spec)
                    .collect::<Vec<_>>()
            }),
            CatalogResource::RecordSchema => serde_json::to_value(schemars::schema_for!(ConfigRecord))?,
            CatalogResource::Tool(name) => {
                if name.is_empty() || name.contains('/') {
                    return Err(ResourceError::invalid_uri(uri));
                }
                let tool = self
                    .registry
                    .definition(&name)
                    .ok_or_else(|| ResourceError::not_found(uri))?;
                tool_spec(tool)
            }
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(serde_json::to_string_pretty(&body)?, uri)],
        })
    }

    fn module_document(&self) -> Value {
        let schema = self.registry.schema();
        json!({
            "name": schema.name(),
            "module_info": schema.module(),
            "tools": self.registry.tool_names(),
            "server_version": env!("CARGO_PKG_VERSION"),
        })
    }
}

/// A tool in the `toolSpec` layout used by converse-style clients.
fn tool_spec(tool: &ToolDefinition) -> Value {
    json!({
        "toolSpec": {
            "name": tool.name,
            "description": tool.rendered_description(),
            "inputSchema": { "json": input_schema(tool) },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ExecutionConfig;
    use crate::domains::catalog::fixtures;
    use crate::domains::store::CollectionRef;
    use crate::domains::store::testing::RecordingStore;
    use crate::domains::tools::Executor;

    fn service() -> ResourceService {
        let schema = Arc::new(fixtures::sample_schema());
        let executor = Executor::new(
            Arc::new(RecordingStore::new()),
            CollectionRef::from(schema.module()),
            100,
        );
        let registry = ToolRegistry::new(schema, executor, None, &ExecutionConfig::default());
        ResourceService::new(Arc::new(registry))
    }

    fn read_json(result: &ReadResourceResult) -> Value {
        match &result.contents[0] {
            ResourceContents::TextResourceContents { text, .. } => serde_json::from_str(text).unwrap(),
            other => panic!("expected text contents, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resource_service_creation() {
        let service = service();
        assert_eq!(service.list_resources().await.len(), 3);
        assert_eq!(service.list_resource_templates().await.len(), 1);
    }

    #[tokio::test]
    async fn test_read_module() {
        let result = service().read_resource("catalog://module").await.unwrap();
        let module = read_json(&result);

        assert_eq!(module["name"], json!("airbnb"));
        assert_eq!(module["module_info"]["database"], json!("sample_airbnb"));
        assert_eq!(module["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_read_tools_as_tool_specs() {
        let result = service().read_resource("catalog://tools").await.unwrap();
        let tools = read_json(&result);
        let specs = tools["tools"].as_array().unwrap();

        assert_eq!(specs.len(), 4);
        let first = &specs[0]["toolSpec"];
        assert_eq!(first["name"], json!("vector_search"));
        assert_eq!(first["inputSchema"]["json"]["type"], json!("object"));
        assert_eq!(first["inputSchema"]["json"]["required"], json!(["query_text"]));
    }

    #[tokio::test]
    async fn test_read_single_tool() {
        let service = service();
        let result = service.read_resource("catalog://tools/text_search").await.unwrap();
        assert_eq!(read_json(&result)["toolSpec"]["name"], json!("text_search"));

        // Gated tools are not described either.
        let err = service.read_resource("catalog://tools/aggregate_query").await.unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));

        let err = service.read_resource("catalog://tools/").await.unwrap_err();
        assert!(matches!(err, ResourceError::InvalidUri(_)));
    }

    #[tokio::test]
    async fn test_read_record_schema() {
        let result = service().read_resource("catalog://record-schema").await.unwrap();
        let schema = read_json(&result);
        assert!(schema["properties"].get("module_info").is_some());
    }

    #[tokio::test]
    async fn test_read_nonexistent_resource() {
        let result = service().read_resource("catalog://nonexistent").await;
        assert!(matches!(result, Err(ResourceError::NotFound(_))));
    }
}
