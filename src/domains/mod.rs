//! Domains module containing business logic organized by bounded contexts.
//!
//! - **catalog**: the tool catalog model, built from a configuration record
//! - **store**: configuration records and the target collection
//! - **embedding**: query text to vector, for vector search tools
//! - **tools**: validation, compilation, execution and registration
//! - **resources**: read-only views of the loaded catalog

pub mod catalog;
pub mod embedding;
pub mod resources;
pub mod store;
pub mod tools;
