//! Deployment configuration loaded from environment variables.
//!
//! Operational knobs (paths, intervals, ports) come from the CLI; deployment
//! identity (which host this is, where events go) comes from the environment
//! so the same unit file works across nodes. Required variables are validated
//! at startup and the process exits immediately if one is missing.

use crate::error::{Error, Result};
use clap::ValueEnum;

/// Which sink variant the daemon ships batches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Parquet files uploaded to an object-storage bucket.
    Parquet,
    /// JSON messages published to a Kafka topic.
    Kafka,
}

/// Sink-specific settings, validated for the active variant only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSettings {
    /// Object-storage bucket for Parquet files.
    Parquet {
        /// Bucket name (`BUCKET_NAME`).
        bucket: String,
    },
    /// Kafka brokers and topic for JSON messages.
    Kafka {
        /// Comma-separated broker list (`KAFKA_BROKERS`).
        brokers: String,
        /// Topic id (`TOPIC_ID`).
        topic: String,
    },
}

/// Deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host identifier stamped on every outgoing record (`HOSTNAME`).
    pub host: String,

    /// Source label used for partitioning and message attribution
    /// (`SOURCE_LABEL`).
    pub source: String,

    /// Settings for the active sink variant.
    pub sink: SinkSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required for every sink:
    /// - `HOSTNAME`: host identifier for outgoing records
    /// - `SOURCE_LABEL`: source label for partitioning
    ///
    /// Required for `--sink parquet`:
    /// - `BUCKET_NAME`: object-storage bucket
    ///
    /// Required for `--sink kafka`:
    /// - `KAFKA_BROKERS`: comma-separated broker list
    /// - `TOPIC_ID`: topic to publish to
    pub fn from_env(kind: SinkKind) -> Result<Self> {
        let host = required("HOSTNAME")?;
        let source = required("SOURCE_LABEL")?;

        let sink = match kind {
            SinkKind::Parquet => SinkSettings::Parquet {
                bucket: required("BUCKET_NAME")?,
            },
            SinkKind::Kafka => SinkSettings::Kafka {
                brokers: required("KAFKA_BROKERS")?,
                topic: required("TOPIC_ID")?,
            },
        };

        tracing::info!(
            host = %host,
            source = %source,
            sink = sink_name(&sink),
            "configuration loaded"
        );

        Ok(Self { host, source, sink })
    }
}

fn required(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "{name} environment variable must be set"
        ))),
    }
}

fn sink_name(sink: &SinkSettings) -> &'static str {
    match sink {
        SinkSettings::Parquet { .. } => "parquet",
        SinkSettings::Kafka { .. } => "kafka",
    }
}
