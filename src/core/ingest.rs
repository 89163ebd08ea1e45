use crate::core::clean::{check_structure, clean_table, CleanOptions};
use crate::core::csv_output::to_csv;
use crate::core::query::incremental_query;
use crate::core::{CheckpointStore, Pipeline, SourceDatabase, Storage};
use crate::domain::model::{
    FileStructures, Table, TableOutcome, TableStatus, TransformResult,
};
use crate::utils::error::Result;
use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub structures: FileStructures,
    /// Folder inside the staging bucket, without trailing slash.
    pub prefix: String,
    pub clean: CleanOptions,
    /// Stamped into every file name produced by this run.
    pub run_timestamp: NaiveDateTime,
}

impl IngestOptions {
    pub fn file_name(&self, table: &str) -> String {
        format!(
            "{}_{}.csv",
            table,
            self.run_timestamp.format("%Y-%m-%d_%H-%M-%S")
        )
    }

    pub fn staging_key(&self, table: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            self.file_name(table)
        } else {
            format!("{}/{}", prefix, self.file_name(table))
        }
    }

    pub fn error_key(&self, table: &str) -> String {
        format!(
            "{}_{}_empty_or_invalid_structure.csv",
            table,
            self.run_timestamp.format("%Y-%m-%d_%H-%M-%S")
        )
    }
}

/// Pulls each configured table since its checkpoint, cleans it and stages it
/// as CSV for the warehouse load.
pub struct IngestPipeline<S: Storage, K: CheckpointStore, D: SourceDatabase> {
    staging: S,
    errors: S,
    checkpoints: K,
    source: D,
    options: IngestOptions,
}

impl<S: Storage, K: CheckpointStore, D: SourceDatabase> IngestPipeline<S, K, D> {
    pub fn new(staging: S, errors: S, checkpoints: K, source: D, options: IngestOptions) -> Self {
        Self {
            staging,
            errors,
            checkpoints,
            source,
            options,
        }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }
}

#[async_trait::async_trait]
impl<S: Storage, K: CheckpointStore, D: SourceDatabase> Pipeline for IngestPipeline<S, K, D> {
    fn tables(&self) -> Vec<String> {
        self.options.structures.table_names()
    }

    async fn extract(&self, table: &str) -> Result<Table> {
        let since = self.checkpoints.get(table).await?;
        match since {
            Some(ts) => tracing::info!("Last processed date for {}: {}", table, ts),
            None => tracing::info!("No processing date found for table: {}", table),
        }

        let query = incremental_query(table, &self.options.clean.cursor_column, since)?;
        tracing::debug!("Executing query: {}", query);

        self.source.fetch(table, &query).await
    }

    async fn transform(&self, table: &str, data: Table) -> Result<TransformResult> {
        if let Some(reason) = check_structure(&data, &self.options.structures) {
            tracing::warn!("⚠️ {} rejected: {}", table, reason);
            return Ok(TransformResult::Rejected {
                table: data,
                reason,
            });
        }

        let (table, checkpoint) = clean_table(data, &self.options.clean);
        Ok(TransformResult::Accepted { table, checkpoint })
    }

    async fn load(&self, table: &str, result: TransformResult) -> Result<TableOutcome> {
        match result {
            TransformResult::Rejected { table: data, reason } => {
                let key = self.options.error_key(table);
                self.errors.write_file(&key, &to_csv(&data)?).await?;
                tracing::info!("Sent {} to error storage at {}", table, self.errors.location(&key));

                Ok(TableOutcome {
                    table: table.to_string(),
                    status: TableStatus::Rejected(reason),
                    object_key: key,
                    rows_written: data.len(),
                    checkpoint: None,
                })
            }
            TransformResult::Accepted {
                table: data,
                checkpoint,
            } => {
                let key = self.options.staging_key(table);
                self.staging.write_file(&key, &to_csv(&data)?).await?;
                tracing::info!(
                    "Uploaded {} rows of {} to {}",
                    data.len(),
                    table,
                    self.staging.location(&key)
                );

                // 上傳成功後才推進 checkpoint
                let checkpoint = match checkpoint {
                    Some(ts) => Some(self.checkpoints.advance(table, ts).await?),
                    None => {
                        tracing::warn!("No cursor values in {}, checkpoint left unchanged", table);
                        None
                    }
                };

                Ok(TableOutcome {
                    table: table.to_string(),
                    status: TableStatus::Uploaded,
                    object_key: key,
                    rows_written: data.len(),
                    checkpoint,
                })
            }
        }
    }
}
