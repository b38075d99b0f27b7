//! Tool-specific error types.

use std::fmt;

use thiserror::Error;

use crate::domains::embedding::EmbeddingError;
use crate::domains::store::StoreError;

/// Why caller input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MissingRequired,
    TypeMismatch,
    ConstraintViolation,
    UnknownParameter,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequired => "MissingRequired",
            Self::TypeMismatch => "TypeMismatch",
            Self::ConstraintViolation => "ConstraintViolation",
            Self::UnknownParameter => "UnknownParameter",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected argument.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} for parameter '{param}': {detail}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub param: String,
    pub detail: String,
    /// The violated constraint, for `ConstraintViolation`.
    pub constraint: Option<String>,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, param: &str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            param: param.to_string(),
            detail: detail.into(),
            constraint: None,
        }
    }

    pub fn missing_required(param: &str) -> Self {
        Self::new(
            ValidationErrorKind::MissingRequired,
            param,
            "required parameter is missing",
        )
    }

    pub fn type_mismatch(param: &str, detail: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::TypeMismatch, param, detail)
    }

    pub fn constraint_violation(
        param: &str,
        constraint: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            constraint: Some(constraint.into()),
            ..Self::new(ValidationErrorKind::ConstraintViolation, param, detail)
        }
    }

    pub fn unknown_parameter(param: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownParameter,
            param,
            "parameter is not declared by this tool",
        )
    }
}

/// Errors that can occur while invoking a tool.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    /// The requested tool is not in the catalog.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Caller input was rejected.
    #[error("Invalid arguments: {0}")]
    Validation(#[from] ValidationError),

    /// The tool definition cannot be turned into a query.
    #[error("Cannot compile tool '{tool}': {reason}")]
    Compilation { tool: String, reason: String },

    /// The database or embedding provider failed.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// The invocation ran past its deadline.
    #[error("Tool execution timed out after {0}s")]
    Timeout(u64),

    /// The caller cancelled the invocation.
    #[error("Tool execution was cancelled")]
    Cancelled,
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "compilation" error.
    pub fn compilation(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compilation {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create a new "execution failed" error.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Error kind reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFoundError",
            Self::Validation(_) => "ValidationError",
            Self::Compilation { .. } => "CompilationError",
            Self::Execution(_) | Self::Timeout(_) | Self::Cancelled => "ExecutionError",
        }
    }

    /// The offending parameter, for validation errors.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::Validation(e) => Some(&e.param),
            _ => None,
        }
    }

    /// The validation sub-kind, for validation errors.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Validation(e) => Some(e.kind.as_str()),
            _ => None,
        }
    }
}

impl From<StoreError> for ToolError {
    fn from(e: StoreError) -> Self {
        Self::Execution(e.to_string())
    }
}

impl From<EmbeddingError> for ToolError {
    fn from(e: EmbeddingError) -> Self {
        Self::Execution(e.to_string())
    }
}
