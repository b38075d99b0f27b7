//! MCP Server Entry Point
//!
//! Initializes logging, loads the tool catalog from the configuration store,
//! connects the target database and starts the server with the configured
//! transport. A catalog that fails to load or build aborts startup.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

use dynamic_mcp_server::core::{Config, McpServer, TransportService, load_catalog};
use dynamic_mcp_server::domains::embedding::{Embedder, HttpEmbedder};
use dynamic_mcp_server::domains::store::{
    CollectionRef, ConfigStore, DocumentStore, FileConfigStore, MongoStore,
};
use dynamic_mcp_server::domains::tools::{Executor, ToolRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Config::from_env();

    // Initialize logging
    init_logging(&config.logging.level, config.logging.with_timestamps);

    info!("Starting {} v{}", config.server.name, config.server.version);

    let mongo = match &config.database.uri {
        Some(uri) => {
            let store = MongoStore::connect(
                uri,
                &config.server.name,
                Duration::from_millis(config.database.timeout_ms),
                CollectionRef::new(&config.catalog.config_db, &config.catalog.config_collection),
            )
            .await
            .context("Failed to configure the MongoDB client")?;
            Some(Arc::new(store))
        }
        None => None,
    };

    // Configuration records come from a file when one is given
    let records: Arc<dyn ConfigStore> = match (&config.catalog.file, &mongo) {
        (Some(path), _) => {
            info!("Reading configuration records from {}", path.display());
            Arc::new(FileConfigStore::new(path))
        }
        (None, Some(store)) => store.clone(),
        (None, None) => bail!("Set MCP_MONGO_URI or MCP_CATALOG_FILE to locate the tool catalog"),
    };

    let schema = load_catalog(
        records.as_ref(),
        &config.catalog.tool_name,
        config.catalog.load_attempts,
        Duration::from_secs(config.catalog.retry_secs),
    )
    .await
    .inspect_err(|e| error!("Startup aborted: {}", e))?;
    let schema = Arc::new(schema);

    let Some(target_store) = mongo else {
        bail!("MCP_MONGO_URI must be set to run queries against the target collection");
    };
    let target_store: Arc<dyn DocumentStore> = target_store;
    let executor = Executor::new(
        target_store,
        CollectionRef::from(schema.module()),
        config.execution.max_results,
    );

    let embedder = HttpEmbedder::from_config(&config.embedding)
        .context("Failed to configure the embedding provider")?
        .map(|e| Arc::new(e) as Arc<dyn Embedder>);

    let registry = Arc::new(ToolRegistry::new(
        schema,
        executor,
        embedder,
        &config.execution,
    ));

    // Create the MCP server
    let transport = TransportService::new(config.transport.clone());
    let server = McpServer::new(config, registry);

    info!("Server initialized");

    transport.run(server).await?;

    info!("Server shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Logs go to stderr; stdout belongs to the STDIO transport.
fn init_logging(level: &str, with_timestamps: bool) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    if with_timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
