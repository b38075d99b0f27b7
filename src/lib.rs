//! Dynamic MCP Server Library
//!
//! An MCP server whose tools are not written in code: they are declared in a
//! stored configuration record and turned into MongoDB queries at call time.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, catalog loading, the main server and transports
//! - **domains**: business logic organized by bounded contexts
//!   - **catalog**: configuration record decoding and the validated tool catalog
//!   - **store**: configuration store and target database access
//!   - **embedding**: embedding provider for vector search
//!   - **tools**: argument validation, query compilation, execution, registration
//!   - **resources**: read-only views of the loaded catalog
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use dynamic_mcp_server::core::{Config, McpServer, load_catalog};
//! use dynamic_mcp_server::domains::store::{CollectionRef, FileConfigStore, MongoStore};
//! use dynamic_mcp_server::domains::tools::{Executor, ToolRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let records = FileConfigStore::new("catalog.json");
//!     let schema = Arc::new(load_catalog(&records, "airbnb", 1, Duration::ZERO).await?);
//!
//!     let target = CollectionRef::from(schema.module());
//!     let store = MongoStore::connect(
//!         "mongodb://localhost:27017",
//!         "dynamic-mcp-server",
//!         Duration::from_secs(5),
//!         CollectionRef::new("mcp_config", "mcp_tools"),
//!     )
//!     .await?;
//!     let executor = Executor::new(Arc::new(store), target, config.execution.max_results);
//!     let registry = ToolRegistry::new(schema, executor, None, &config.execution);
//!     let server = McpServer::new(config, Arc::new(registry));
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
