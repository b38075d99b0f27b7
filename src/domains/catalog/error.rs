//! Catalog-specific error types.

use thiserror::Error;

/// Errors raised while decoding or building a tool catalog.
///
/// Every variant is fatal at startup: a catalog that fails to build is never
/// exposed to clients.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The stored record does not have the expected document shape.
    #[error("Invalid configuration record: {0}")]
    Decode(String),

    /// The module metadata is unusable.
    #[error("Invalid module_info: {0}")]
    InvalidModule(String),

    /// A tool definition violates a structural invariant.
    #[error("Invalid tool '{tool}': {reason}")]
    InvalidTool { tool: String, reason: String },
}

impl SchemaError {
    /// Create a new "invalid tool" error.
    pub fn invalid_tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTool {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create a new "invalid module" error.
    pub fn invalid_module(msg: impl Into<String>) -> Self {
        Self::InvalidModule(msg.into())
    }

    /// The offending tool, when the error concerns one.
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::InvalidTool { tool, .. } => Some(tool),
            _ => None,
        }
    }
}
