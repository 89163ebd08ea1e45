use crate::domain::model::{Table, TableOutcome, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// One bucket (or local directory); paths are keys relative to it.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Where `path` lives, for logs and run summaries.
    fn location(&self, path: &str) -> String;
}

pub trait CheckpointStore: Send + Sync {
    fn get(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = Result<Option<NaiveDateTime>>> + Send;

    /// Records `processed` for `table` unless the stored value is already newer.
    /// Returns the value that is stored afterwards.
    fn advance(
        &self,
        table: &str,
        processed: NaiveDateTime,
    ) -> impl std::future::Future<Output = Result<NaiveDateTime>> + Send;
}

pub trait SourceDatabase: Send + Sync {
    fn fetch(
        &self,
        table: &str,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Table>> + Send;
}

pub trait Warehouse: Send + Sync {
    /// Submits one statement, returning the id the warehouse assigned to it.
    fn execute(&self, sql: &str) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn tables(&self) -> Vec<String>;
    async fn extract(&self, table: &str) -> Result<Table>;
    async fn transform(&self, table: &str, data: Table) -> Result<TransformResult>;
    async fn load(&self, table: &str, result: TransformResult) -> Result<TableOutcome>;
}
