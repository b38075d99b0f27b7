//! In-memory store that records every call.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{CollectionRef, ConfigStore, DocumentStore, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Load(String),
    Aggregate {
        target: CollectionRef,
        pipeline: Vec<Value>,
        max_results: usize,
    },
    Distinct(String),
    Stats,
    ListIndexes,
    ListSearchIndexes,
    Ping,
}

pub(crate) struct RecordingStore {
    calls: Mutex<Vec<Call>>,
    records: Vec<Value>,
    load_failures: Mutex<VecDeque<StoreError>>,
    documents: Vec<Value>,
    distinct: Vec<Value>,
    search_indexes: Option<Vec<Value>>,
    failure: Option<StoreError>,
    delay: Option<Duration>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            records: Vec::new(),
            load_failures: Mutex::new(VecDeque::new()),
            documents: Vec::new(),
            distinct: Vec::new(),
            search_indexes: None,
            failure: None,
            delay: None,
        }
    }

    pub fn with_record(mut self, record: Value) -> Self {
        self.records.push(record);
        self
    }

    /// Fail the next loads with these errors, in order.
    pub fn with_load_failures(self, failures: impl IntoIterator<Item = StoreError>) -> Self {
        self.load_failures.lock().unwrap().extend(failures);
        self
    }

    pub fn with_documents(mut self, documents: Vec<Value>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_distinct(mut self, values: Vec<Value>) -> Self {
        self.distinct = values;
        self
    }

    pub fn with_search_indexes(mut self, indexes: Vec<Value>) -> Self {
        self.search_indexes = Some(indexes);
        self
    }

    /// Fail every database call with `error`.
    pub fn with_failure(mut self, error: StoreError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Sleep before answering every database call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: Call) -> StoreResult<()> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ConfigStore for RecordingStore {
    async fn load(&self, name: &str) -> StoreResult<Value> {
        self.calls.lock().unwrap().push(Call::Load(name.to_string()));
        if let Some(error) = self.load_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.records
            .iter()
            .find(|r| r.get("name").and_then(Value::as_str) == Some(name))
            .cloned()
            .ok_or_else(|| StoreError::not_found(name))
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn aggregate(
        &self,
        target: &CollectionRef,
        pipeline: Vec<Value>,
        max_results: usize,
    ) -> StoreResult<Vec<Value>> {
        self.record(Call::Aggregate {
            target: target.clone(),
            pipeline,
            max_results,
        })
        .await?;
        Ok(self.documents.iter().take(max_results).cloned().collect())
    }

    async fn distinct(&self, _target: &CollectionRef, field: &str) -> StoreResult<Vec<Value>> {
        self.record(Call::Distinct(field.to_string())).await?;
        Ok(self.distinct.clone())
    }

    async fn stats(&self, _target: &CollectionRef) -> StoreResult<Value> {
        self.record(Call::Stats).await?;
        Ok(json!({"count": self.documents.len(), "size": 2048, "avgObjSize": 512, "nindexes": 1}))
    }

    async fn list_indexes(&self, _target: &CollectionRef) -> StoreResult<Vec<Value>> {
        self.record(Call::ListIndexes).await?;
        Ok(vec![json!({"name": "_id_", "key": {"_id": 1}})])
    }

    async fn list_search_indexes(&self, _target: &CollectionRef) -> StoreResult<Vec<Value>> {
        self.record(Call::ListSearchIndexes).await?;
        self.search_indexes
            .clone()
            .ok_or_else(|| StoreError::operation("$listSearchIndexes is not supported"))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.record(Call::Ping).await
    }
}
