//! JSON-file configuration store.
//!
//! The file holds either one record or an array of records. It is re-read
//! on every `load`, which only happens at startup.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{ConfigStore, StoreError, StoreResult};

/// Configuration records read from a local JSON file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self, name: &str) -> StoreResult<Value> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            StoreError::unavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let parsed: Value = serde_json::from_str(&content).map_err(|e| {
            StoreError::operation(format!("{} is not valid JSON: {}", self.path.display(), e))
        })?;

        let records = match parsed {
            Value::Array(records) => records,
            record @ Value::Object(_) => vec![record],
            _ => {
                return Err(StoreError::operation(format!(
                    "{} must hold a record or an array of records",
                    self.path.display()
                )));
            }
        };
        debug!("{} holds {} record(s)", self.path.display(), records.len());

        records
            .into_iter()
            .find(|record| record_name(record) == Some(name))
            .ok_or_else(|| {
                StoreError::not_found(format!(
                    "no record named '{}' in {}",
                    name,
                    self.path.display()
                ))
            })
    }
}

fn record_name(record: &Value) -> Option<&str> {
    record
        .get("name")
        .or_else(|| record.get("Name"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_single_record() {
        let file = write_file(r#"{"name": "solo", "module_info": {"database": "d", "collection": "c"}}"#);
        let store = FileConfigStore::new(file.path());

        let record = store.load("solo").await.unwrap();
        assert_eq!(record["module_info"]["database"], json!("d"));
    }

    #[tokio::test]
    async fn test_load_picks_matching_record() {
        let file = write_file(r#"[{"name": "a", "v": 1}, {"Name": "b", "v": 2}]"#);
        let store = FileConfigStore::new(file.path());

        assert_eq!(store.load("b").await.unwrap()["v"], json!(2));
        assert_eq!(store.load("a").await.unwrap()["v"], json!(1));
    }

    #[tokio::test]
    async fn test_load_missing_record_is_not_found() {
        let file = write_file(r#"[{"name": "a"}]"#);
        let store = FileConfigStore::new(file.path());

        let err = store.load("zzz").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("absent.json"));

        let err = store.load("a").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_operation_error() {
        let file = write_file("{ not json");
        let store = FileConfigStore::new(file.path());

        let err = store.load("a").await.unwrap_err();
        assert!(matches!(err, StoreError::Operation(_)));
    }
}
