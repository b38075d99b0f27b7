//! Resources domain module.
//!
//! Resources let clients inspect the loaded catalog without invoking tools:
//! where the tools run, what they accept, and how to write a new record.
//!
//! ## Architecture
//!
//! - `registry.rs` - Resource URIs and metadata
//! - `service.rs` - Resource service for listing and reading
//! - `error.rs` - Resource-specific error types

mod error;
mod registry;
mod service;

pub use error::ResourceError;
pub use registry::{
    CatalogResource, MODULE_URI, RECORD_SCHEMA_URI, TOOL_URI_PREFIX, TOOLS_URI, get_all_resources,
    resource_uris,
};
pub use service::ResourceService;
