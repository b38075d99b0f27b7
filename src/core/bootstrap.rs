//! Startup: load the configuration record and build the catalog.

use std::time::Duration;

use tracing::{error, info, warn};

use super::error::{Error, Result};
use crate::domains::catalog::ToolSchema;
use crate::domains::store::ConfigStore;

/// Load and build the named catalog.
///
/// Only an unreachable store is retried, up to `attempts` times with `delay`
/// between attempts. A missing record or an invalid catalog aborts at once.
pub async fn load_catalog(
    store: &dyn ConfigStore,
    name: &str,
    attempts: u32,
    delay: Duration,
) -> Result<ToolSchema> {
    let attempts = attempts.max(1);
    let mut attempt = 1;

    let document = loop {
        match store.load(name).await {
            Ok(document) => break document,
            Err(e) if e.is_unavailable() && attempt < attempts => {
                warn!(
                    "Configuration store unavailable (attempt {}/{}): {}. Retrying in {:?}",
                    attempt, attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!("Failed to load configuration record '{}': {}", name, e);
                return Err(e.into());
            }
        }
    };

    let schema = ToolSchema::from_document(document).map_err(|e| {
        error!("Configuration record '{}' is invalid: {}", name, e);
        Error::from(e)
    })?;

    info!(
        "Loaded catalog '{}' with {} tools targeting {}.{}",
        schema.name(),
        schema.len(),
        schema.module().database,
        schema.module().collection
    );
    Ok(schema)
}
