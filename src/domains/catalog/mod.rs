//! Catalog domain module.
//!
//! The tool catalog is data, not code: a stored configuration record names
//! the target collection and declares every tool with its parameters.
//!
//! ## Architecture
//!
//! - `record.rs` - Stored record shape (decoding only)
//! - `constraint.rs` - Numeric and length bounds, with the expression parser
//! - `schema.rs` - Validated catalog and tool kind inference
//! - `error.rs` - Catalog-specific error types

mod constraint;
mod error;
mod record;
mod schema;

#[cfg(test)]
pub(crate) mod fixtures;

pub use constraint::{Constraint, NumericCheck};
pub use error::SchemaError;
pub use record::{ConfigRecord, ConstraintBounds, ModuleInfo, RawConstraint, RawParameterSpec, RawToolDefinition};
pub use schema::{
    DEFAULT_VECTOR_PATH, ParamSpec, ParamType, Projection, ToolDefinition, ToolKind, ToolSchema,
    WILDCARD_PATH,
};
