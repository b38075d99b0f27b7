//! Operation execution.
//!
//! Runs compiled operations against the target collection and shapes the
//! results. The result ceiling here is independent of any tool-declared
//! limit and applies to every operation.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use super::compiler::CompiledOperation;
use super::error::ToolError;
use crate::domains::catalog::Projection;
use crate::domains::store::{CollectionRef, DocumentStore};

/// Successful tool output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub results: Vec<Value>,
    pub count: usize,
}

impl ResultSet {
    fn new(results: Vec<Value>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}

/// Database reachability report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: String,
    pub collection: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Runs operations against one collection.
pub struct Executor {
    store: Arc<dyn DocumentStore>,
    target: CollectionRef,
    max_results: usize,
}

impl Executor {
    pub fn new(store: Arc<dyn DocumentStore>, target: CollectionRef, max_results: usize) -> Self {
        Self {
            store,
            target,
            max_results: max_results.max(1),
        }
    }

    pub fn target(&self) -> &CollectionRef {
        &self.target
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Run an operation once. Database errors are returned with their cause.
    #[instrument(skip_all, fields(target = %self.target))]
    pub async fn execute(
        &self,
        operation: CompiledOperation,
        projection: Option<&Projection>,
    ) -> Result<ResultSet, ToolError> {
        let results = match operation {
            CompiledOperation::Pipeline {
                stages,
                projection_embedded,
            } => {
                // One extra document tells a full page from a truncated one.
                let mut documents = self
                    .store
                    .aggregate(&self.target, stages, self.max_results.saturating_add(1))
                    .await?;
                self.enforce_ceiling(&mut documents);

                match projection {
                    Some(projection) if !projection_embedded => documents
                        .into_iter()
                        .map(|doc| projection.apply(doc))
                        .collect(),
                    _ => documents,
                }
            }
            CompiledOperation::Distinct { field } => {
                let mut values = self.store.distinct(&self.target, &field).await?;
                values.retain(|v| !v.is_null());
                self.enforce_ceiling(&mut values);
                values
            }
            CompiledOperation::CollectionInfo => vec![self.collection_info().await?],
        };

        debug!("Operation returned {} results", results.len());
        Ok(ResultSet::new(results))
    }

    fn enforce_ceiling(&self, results: &mut Vec<Value>) {
        if results.len() > self.max_results {
            warn!(
                "Result set from {} truncated to the {} result ceiling",
                self.target, self.max_results
            );
            results.truncate(self.max_results);
        }
    }

    async fn collection_info(&self) -> Result<Value, ToolError> {
        let (stats, indexes) = futures::try_join!(
            self.store.stats(&self.target),
            self.store.list_indexes(&self.target),
        )?;

        // Only Atlas deployments have search indexes.
        let search_indexes = match self.store.list_search_indexes(&self.target).await {
            Ok(indexes) => indexes,
            Err(e) => {
                debug!("No search indexes available: {}", e);
                Vec::new()
            }
        };

        let sample = self
            .store
            .aggregate(&self.target, vec![json!({ "$sample": { "size": 1 } })], 1)
            .await?;
        let sample_shape = sample
            .first()
            .and_then(Value::as_object)
            .map(shape_of)
            .unwrap_or_default();

        Ok(json!({
            "database": self.target.database,
            "collection": self.target.collection,
            "count": stats.get("count").cloned().unwrap_or(Value::Null),
            "size": stats.get("size").cloned().unwrap_or(Value::Null),
            "avg_document_size": stats.get("avgObjSize").cloned().unwrap_or(Value::Null),
            "indexes": indexes,
            "search_indexes": search_indexes,
            "sample_shape": sample_shape,
        }))
    }

    /// Ping the database.
    pub async fn health(&self) -> HealthReport {
        let outcome = self.store.ping().await;
        HealthReport {
            status: if outcome.is_ok() { "healthy" } else { "unhealthy" },
            database: self.target.database.clone(),
            collection: self.target.collection.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            error: outcome.err().map(|e| e.to_string()),
        }
    }
}

/// Map each top-level field to a type name.
fn shape_of(document: &Map<String, Value>) -> Map<String, Value> {
    document
        .iter()
        .map(|(field, value)| (field.clone(), Value::from(type_name(value))))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "double",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(map) => {
            // Relaxed extended JSON wrappers
            match map.keys().next().map(String::as_str) {
                Some("$oid") if map.len() == 1 => "objectId",
                Some("$date") if map.len() == 1 => "date",
                Some("$numberDecimal") if map.len() == 1 => "decimal",
                Some("$numberLong") if map.len() == 1 => "long",
                Some("$binary") if map.len() == 1 => "binData",
                _ => "object",
            }
        }
    }
}
