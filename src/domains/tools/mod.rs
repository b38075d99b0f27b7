//! Tools domain module.
//!
//! Tools are not written by hand here: each one is a definition in the
//! loaded catalog, and every call runs through the same pipeline.
//!
//! ## Architecture
//!
//! - `validator.rs` - Checks and coerces caller arguments
//! - `compiler.rs` - Turns validated arguments into a database operation
//! - `executor.rs` - Runs operations with a result ceiling and projection
//! - `registry.rs` - The exposed tools, their metadata, and invocation
//! - `router.rs` - Dynamic ToolRouter builder for STDIO/TCP transport
//! - `handlers.rs` - Success and failure envelopes
//! - `error.rs` - Tool-specific error types

mod compiler;
mod error;
mod executor;
mod handlers;
mod registry;
pub mod router;
mod validator;

pub use compiler::{CompiledOperation, DEFAULT_LIMIT, DEFAULT_NUM_CANDIDATES, compile};
pub use error::{ToolError, ValidationError, ValidationErrorKind};
pub use executor::{Executor, HealthReport, ResultSet};
pub use handlers::*;
pub use registry::{ToolRegistry, input_schema, to_tool};
pub use router::build_tool_router;
pub use validator::{ArgValue, ValidatedArgs, validate};
