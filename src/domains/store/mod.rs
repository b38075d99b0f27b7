//! Store domain module.
//!
//! Two collaborators live behind traits here: the configuration store that
//! holds catalog records, and the document database the tools query. The
//! server only builds logical pipelines; the wire protocol belongs to the
//! backend.
//!
//! ## Architecture
//!
//! - `mongo.rs` - MongoDB backend for both traits
//! - `file.rs` - JSON-file configuration store for local runs
//! - `error.rs` - Store-specific error types

mod error;
mod file;
mod mongo;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domains::catalog::ModuleInfo;

pub use error::{StoreError, StoreResult};
pub use file::FileConfigStore;
pub use mongo::MongoStore;

/// A database/collection pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CollectionRef {
    pub database: String,
    pub collection: String,
}

impl CollectionRef {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl From<&ModuleInfo> for CollectionRef {
    fn from(module: &ModuleInfo) -> Self {
        Self::new(&module.database, &module.collection)
    }
}

impl std::fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Lookup of configuration records by name.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the raw record named `name`.
    ///
    /// Fails with [`StoreError::NotFound`] when nothing matches and with
    /// [`StoreError::Unavailable`] when the store cannot be reached. Makes a
    /// single attempt.
    async fn load(&self, name: &str) -> StoreResult<Value>;
}

/// The target database, as seen by the executor.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a pipeline and collect at most `max_results` documents.
    async fn aggregate(
        &self,
        target: &CollectionRef,
        pipeline: Vec<Value>,
        max_results: usize,
    ) -> StoreResult<Vec<Value>>;

    /// Distinct values of a (dotted) field path.
    async fn distinct(&self, target: &CollectionRef, field: &str) -> StoreResult<Vec<Value>>;

    /// Collection statistics.
    async fn stats(&self, target: &CollectionRef) -> StoreResult<Value>;

    /// Regular indexes as `{name, key}` documents.
    async fn list_indexes(&self, target: &CollectionRef) -> StoreResult<Vec<Value>>;

    /// Search and vector indexes. Deployments without them fail here.
    async fn list_search_indexes(&self, target: &CollectionRef) -> StoreResult<Vec<Value>>;

    /// Round-trip to the server.
    async fn ping(&self) -> StoreResult<()>;
}
