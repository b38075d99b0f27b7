//! MongoDB backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection,
    bson::{self, Bson, Document, doc},
    error::ErrorKind,
    options::ClientOptions,
};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use super::{CollectionRef, ConfigStore, DocumentStore, StoreError, StoreResult};

/// A MongoDB deployment serving both catalog records and tool queries.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    config_target: CollectionRef,
}

impl MongoStore {
    /// Connect lazily; the driver opens sockets on first use.
    pub async fn connect(
        uri: &str,
        app_name: &str,
        timeout: Duration,
        config_target: CollectionRef,
    ) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri).await.map_err(map_error)?;
        options.app_name = Some(app_name.to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(map_error)?;
        info!("MongoDB client created (records in {})", config_target);

        Ok(Self {
            client,
            config_target,
        })
    }

    fn collection(&self, target: &CollectionRef) -> Collection<Document> {
        self.client
            .database(&target.database)
            .collection(&target.collection)
    }
}

#[async_trait]
impl ConfigStore for MongoStore {
    #[instrument(skip(self))]
    async fn load(&self, name: &str) -> StoreResult<Value> {
        let filter = doc! { "$or": [ { "name": name }, { "Name": name } ] };
        let found = self
            .collection(&self.config_target)
            .find_one(filter)
            .await
            .map_err(map_error)?;

        match found {
            Some(document) => Ok(to_json(document)),
            None => Err(StoreError::not_found(format!(
                "no record named '{}' in {}",
                name, self.config_target
            ))),
        }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn aggregate(
        &self,
        target: &CollectionRef,
        pipeline: Vec<Value>,
        max_results: usize,
    ) -> StoreResult<Vec<Value>> {
        let stages = pipeline
            .iter()
            .map(|stage| {
                bson::to_document(stage)
                    .map_err(|e| StoreError::operation(format!("invalid pipeline stage: {}", e)))
            })
            .collect::<StoreResult<Vec<Document>>>()?;

        let mut cursor = self
            .collection(target)
            .aggregate(stages)
            .await
            .map_err(map_error)?;

        let mut results = Vec::new();
        while results.len() < max_results {
            match cursor.try_next().await.map_err(map_error)? {
                Some(document) => results.push(to_json(document)),
                None => break,
            }
        }
        debug!("Aggregation on {} returned {} documents", target, results.len());
        Ok(results)
    }

    async fn distinct(&self, target: &CollectionRef, field: &str) -> StoreResult<Vec<Value>> {
        let values = self
            .collection(target)
            .distinct(field, doc! {})
            .await
            .map_err(map_error)?;
        Ok(values.into_iter().map(Bson::into_relaxed_extjson).collect())
    }

    async fn stats(&self, target: &CollectionRef) -> StoreResult<Value> {
        let stats = self
            .client
            .database(&target.database)
            .run_command(doc! { "collStats": target.collection.as_str() })
            .await
            .map_err(map_error)?;
        Ok(to_json(stats))
    }

    async fn list_indexes(&self, target: &CollectionRef) -> StoreResult<Vec<Value>> {
        let mut cursor = self
            .collection(target)
            .list_indexes()
            .await
            .map_err(map_error)?;

        let mut indexes = Vec::new();
        while let Some(model) = cursor.try_next().await.map_err(map_error)? {
            let name = model.options.as_ref().and_then(|o| o.name.clone());
            indexes.push(json!({ "name": name, "key": to_json(model.keys) }));
        }
        Ok(indexes)
    }

    async fn list_search_indexes(&self, target: &CollectionRef) -> StoreResult<Vec<Value>> {
        self.aggregate(target, vec![json!({ "$listSearchIndexes": {} })], usize::MAX)
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(map_error)?;
        Ok(())
    }
}

fn to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}

fn map_error(e: mongodb::error::Error) -> StoreError {
    match e.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Authentication { .. } => StoreError::unavailable(e.to_string()),
        _ => StoreError::operation(e.to_string()),
    }
}
