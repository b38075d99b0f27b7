//! Configuration management for the MCP server.
//!
//! Configuration is read once at startup from environment variables (after an
//! optional `.env` file) and never changes afterwards. Each concern has its
//! own section with sensible defaults.

use super::transport::TransportConfig;
use crate::domains::embedding::EmbeddingFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Which configuration record to load, and from where.
    pub catalog: CatalogConfig,

    /// Target database connection.
    pub database: DatabaseConfig,

    /// Embedding provider for vector search tools.
    pub embedding: EmbeddingConfig,

    /// Limits applied to every tool invocation.
    pub execution: ExecutionConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "dynamic-mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_timestamps: true,
        }
    }
}

/// Configuration record selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Name of the record to load.
    pub tool_name: String,

    /// Read records from this JSON file instead of the database.
    pub file: Option<PathBuf>,

    /// Database holding configuration records.
    pub config_db: String,

    /// Collection holding configuration records.
    pub config_collection: String,

    /// Attempts made while the store is unreachable.
    pub load_attempts: u32,

    /// Pause between attempts.
    pub retry_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            tool_name: "default".to_string(),
            file: None,
            config_db: "mcp_config".to_string(),
            config_collection: "mcp_tools".to_string(),
            load_attempts: 3,
            retry_secs: 10,
        }
    }
}

/// Target database connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string. Usually carries credentials.
    pub uri: Option<String>,

    /// Server selection and connect timeout, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            timeout_ms: 5000,
        }
    }
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("uri", &self.uri.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Embedding provider configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// HTTP endpoint. Vector search is unavailable without one.
    pub url: Option<String>,

    /// Bearer token sent with every request.
    pub api_key: Option<String>,

    /// Model id sent to the endpoint.
    pub model: String,

    /// Request/response shape; inferred from the model when unset.
    pub format: Option<EmbeddingFormat>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            model: "amazon.titan-embed-text-v2:0".to_string(),
            format: None,
        }
    }
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("format", &self.format)
            .finish()
    }
}

/// Invocation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Absolute result ceiling, whatever limit a tool declares.
    pub max_results: usize,

    /// Per-invocation deadline in seconds.
    pub invocation_timeout_secs: u64,

    /// Expose tools that run caller-supplied pipelines.
    pub allow_raw_aggregation: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_results: 1000,
            invocation_timeout_secs: 60,
            allow_raw_aggregation: false,
        }
    }
}

/// Read a typed variable, keeping the default when it is unset or malformed.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring malformed {}={:?}, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

/// Read a boolean variable. Accepts true/false, 1/0, yes/no.
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                warn!("Ignoring malformed {}={:?}, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_MONGO_URI`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(name) = env_string("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Some(level) = env_string("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }
        config.logging.with_timestamps =
            env_flag("MCP_LOG_TIMESTAMPS", config.logging.with_timestamps);

        config.transport = TransportConfig::from_env();

        // Catalog
        if let Some(tool_name) = env_string("MCP_TOOL_NAME") {
            config.catalog.tool_name = tool_name;
        }
        config.catalog.file = env_string("MCP_CATALOG_FILE").map(PathBuf::from);
        if let Some(db) = env_string("MCP_CONFIG_DB") {
            config.catalog.config_db = db;
        }
        if let Some(collection) = env_string("MCP_CONFIG_COLLECTION") {
            config.catalog.config_collection = collection;
        }
        config.catalog.load_attempts =
            env_parse("MCP_CATALOG_LOAD_ATTEMPTS", config.catalog.load_attempts).max(1);
        config.catalog.retry_secs = env_parse("MCP_CATALOG_RETRY_SECS", config.catalog.retry_secs);

        // Database
        config.database.uri = env_string("MCP_MONGO_URI");
        config.database.timeout_ms = env_parse("MCP_MONGO_TIMEOUT_MS", config.database.timeout_ms);

        // Embedding
        config.embedding.url = env_string("MCP_EMBEDDING_URL");
        config.embedding.api_key = env_string("MCP_EMBEDDING_API_KEY");
        if let Some(model) = env_string("MCP_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(format) = env_string("MCP_EMBEDDING_FORMAT") {
            config.embedding.format = EmbeddingFormat::parse(&format);
            if config.embedding.format.is_none() {
                warn!(
                    "Ignoring unknown MCP_EMBEDDING_FORMAT={:?}, inferring from model",
                    format
                );
            }
        }
        if config.embedding.url.is_none() {
            warn!("MCP_EMBEDDING_URL not set - vector search tools will fail");
        }

        // Execution
        config.execution.max_results =
            env_parse("MCP_MAX_RESULTS", config.execution.max_results).max(1);
        config.execution.invocation_timeout_secs = env_parse(
            "MCP_INVOCATION_TIMEOUT_SECS",
            config.execution.invocation_timeout_secs,
        );
        config.execution.allow_raw_aggregation = env_flag(
            "MCP_ALLOW_RAW_AGGREGATION",
            config.execution.allow_raw_aggregation,
        );
        if config.execution.allow_raw_aggregation {
            info!("Raw aggregation tools enabled");
        }

        config
    }
}
