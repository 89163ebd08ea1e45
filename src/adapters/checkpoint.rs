use crate::core::clean::{format_timestamp, parse_timestamp};
use crate::core::{CheckpointStore, Storage};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

pub const DEFAULT_CHECKPOINT_KEY: &str = "_state/processed_dates.json";

/// Keeps `{ "<table>": "<last processed timestamp>" }` as one JSON object
/// in a `Storage`.
///
/// Read-modify-write with no locking: two overlapping runs can both read the
/// same document. `advance` never moves a table backwards, so the worst case
/// is rows being staged twice.
pub struct StorageCheckpointStore<S: Storage> {
    storage: S,
    key: String,
}

impl<S: Storage> StorageCheckpointStore<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    async fn load_all(&self) -> Result<BTreeMap<String, String>> {
        match self.storage.read_file(&self.key).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(EtlError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No checkpoint document at {}", self.storage.location(&self.key));
                Ok(BTreeMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn parse(&self, table: &str, raw: &str) -> Result<NaiveDateTime> {
        parse_timestamp(raw).ok_or_else(|| EtlError::CheckpointError {
            message: format!("stored checkpoint for {} is not a timestamp: '{}'", table, raw),
        })
    }
}

impl<S: Storage> CheckpointStore for StorageCheckpointStore<S> {
    async fn get(&self, table: &str) -> Result<Option<NaiveDateTime>> {
        let all = self.load_all().await?;
        all.get(table).map(|raw| self.parse(table, raw)).transpose()
    }

    async fn advance(&self, table: &str, processed: NaiveDateTime) -> Result<NaiveDateTime> {
        let mut all = self.load_all().await?;

        if let Some(raw) = all.get(table) {
            let current = self.parse(table, raw)?;
            if current >= processed {
                tracing::debug!(
                    "Checkpoint for {} already at {}, not moving back to {}",
                    table,
                    current,
                    processed
                );
                return Ok(current);
            }
        }

        all.insert(table.to_string(), format_timestamp(processed));
        let data = serde_json::to_vec_pretty(&all)?;
        self.storage.write_file(&self.key, &data).await?;

        tracing::info!("Marked {} processed up to {}", table, processed);
        Ok(processed)
    }
}
