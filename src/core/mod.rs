pub mod clean;
pub mod csv_output;
pub mod etl;
pub mod ingest;
pub mod load;
pub mod query;

pub use crate::domain::model::{Table, TransformResult};
pub use crate::domain::ports::{CheckpointStore, Pipeline, SourceDatabase, Storage, Warehouse};
pub use crate::utils::error::Result;
