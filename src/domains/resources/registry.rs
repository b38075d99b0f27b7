//! Resource Registry - the fixed set of catalog resources.
//!
//! Resource contents are computed from the loaded catalog when read; only
//! the metadata lives here.

use rmcp::model::{AnnotateAble, RawResource, RawResourceTemplate, Resource, ResourceTemplate};

/// Module metadata of the loaded catalog.
pub const MODULE_URI: &str = "catalog://module";

/// Every exposed tool in `toolSpec` layout.
pub const TOOLS_URI: &str = "catalog://tools";

/// JSON Schema of a configuration record.
pub const RECORD_SCHEMA_URI: &str = "catalog://record-schema";

/// Prefix of the per-tool template.
pub const TOOL_URI_PREFIX: &str = "catalog://tools/";

const JSON: &str = "application/json";

/// What a resource URI resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResource {
    Module,
    Tools,
    RecordSchema,
    Tool(String),
}

impl CatalogResource {
    /// Resolve a URI. `None` when the URI is not a catalog resource.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            MODULE_URI => Some(Self::Module),
            TOOLS_URI => Some(Self::Tools),
            RECORD_SCHEMA_URI => Some(Self::RecordSchema),
            _ => uri
                .strip_prefix(TOOL_URI_PREFIX)
                .map(|name| Self::Tool(name.to_string())),
        }
    }
}

fn build_resource(uri: &str, name: &str, description: &str) -> Resource {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description.to_string());
    raw.mime_type = Some(JSON.to_string());
    raw.no_annotation()
}

/// Get all registered resources.
pub fn get_all_resources() -> Vec<Resource> {
    vec![
        build_resource(
            MODULE_URI,
            "Catalog Module",
            "Target database, collection and description of the loaded tool catalog",
        ),
        build_resource(
            TOOLS_URI,
            "Catalog Tools",
            "Every exposed tool as a toolSpec (name, description, inputSchema)",
        ),
        build_resource(
            RECORD_SCHEMA_URI,
            "Configuration Record Schema",
            "JSON Schema for writing configuration records",
        ),
    ]
}

/// Get all registered resource templates.
pub fn get_all_resource_templates() -> Vec<ResourceTemplate> {
    vec![
        RawResourceTemplate {
            uri_template: format!("{}{{name}}", TOOL_URI_PREFIX),
            name: "Catalog Tool".to_string(),
            title: Some("One catalog tool".to_string()),
            description: Some("A single exposed tool as a toolSpec".to_string()),
            mime_type: Some(JSON.to_string()),
        }
        .no_annotation(),
    ]
}

/// Get the list of all resource URIs.
pub fn resource_uris() -> Vec<&'static str> {
    vec![MODULE_URI, TOOLS_URI, RECORD_SCHEMA_URI]
}
