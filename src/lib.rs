pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{
    checkpoint::StorageCheckpointStore, storage::LocalStorage, warehouse::HttpWarehouse,
};

#[cfg(feature = "postgres")]
pub use adapters::postgres::PgSource;

#[cfg(feature = "lambda")]
pub use adapters::s3::S3Storage;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::Settings;
pub use crate::core::{
    etl::EtlEngine,
    ingest::{IngestOptions, IngestPipeline},
    load::{LoadHandler, LoadOptions},
};
pub use utils::error::{EtlError, Result};
