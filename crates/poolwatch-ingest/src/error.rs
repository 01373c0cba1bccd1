//! Error types for the ingestion daemon.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while tailing, correlating, and shipping events.
#[derive(Error, Debug)]
pub enum Error {
    /// Extraction error from the core crate (matched line with a bad field).
    #[error("extraction error: {0}")]
    Extract(#[from] poolwatch_core::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON encoding error for outgoing messages.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow record batch construction error.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet encoding error.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Object storage error.
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Kafka client error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// A publish task panicked or was cancelled before completing.
    #[error("publish task failed: {0}")]
    PublishTask(#[from] tokio::task::JoinError),
}
