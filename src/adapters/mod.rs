// Adapters layer: concrete implementations of the domain ports (storage, checkpoints, source, warehouse).

pub mod checkpoint;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "lambda")]
pub mod s3;
pub mod storage;
pub mod warehouse;
