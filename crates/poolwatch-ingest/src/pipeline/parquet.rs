//! Parquet sink: encodes a batch to one columnar file and uploads it to
//! object storage.
//!
//! Objects land under the warehouse partitioning convention
//! `source={source}/dt={YYYY-MM-DD}/{host}.{%Y-%m-%dT%H-%M-%S}.parquet`,
//! with both the partition date and the file name stamped from the flush
//! time. Delivery is synchronous: a batch is fully encoded and uploaded
//! before `deliver` returns, so `drain` has nothing to wait for.

use super::BatchSink;
use crate::Result;
use arrow::array::{ArrayRef, Int32Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use poolwatch_core::{AcceptEvent, EVENT_TYPE_MEMPOOL_ACCEPT};
use std::sync::Arc;
use tracing::info;

/// Configuration for the Parquet sink.
#[derive(Debug, Clone)]
pub struct ParquetSinkConfig {
    /// Host identifier stamped on every record and file name.
    pub host: String,

    /// Source label used as the top-level partition key.
    pub source: String,
}

/// Parquet-encoding object-storage sink.
pub struct ParquetSink {
    store: Arc<dyn ObjectStore>,
    config: ParquetSinkConfig,
}

impl ParquetSink {
    /// Sink writing to an arbitrary object store (used directly in tests).
    pub fn new(store: Arc<dyn ObjectStore>, config: ParquetSinkConfig) -> Self {
        Self { store, config }
    }

    /// Sink writing to a GCS bucket, with credentials from the environment.
    pub fn gcs(bucket: &str, config: ParquetSinkConfig) -> Result<Self> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()?;

        info!(
            "Parquet sink initialized: bucket={}, source={}, host={}",
            bucket, config.source, config.host
        );

        Ok(Self::new(Arc::new(store), config))
    }

    /// Arrow schema matching the warehouse's mempool activity table.
    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("event_type", DataType::Utf8, false),
            Field::new("host", DataType::Utf8, false),
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
            Field::new("txhash", DataType::Utf8, false),
            Field::new("peer_num", DataType::Int32, true),
            Field::new("pool_size_txns", DataType::Int32, true),
            Field::new("pool_size_kb", DataType::Int32, true),
            Field::new("replace_txhash", DataType::Utf8, true),
        ]))
    }

    /// Encode one batch into an in-memory Parquet file.
    fn encode(&self, events: &[AcceptEvent]) -> Result<Vec<u8>> {
        let schema = Self::schema();

        let event_type: ArrayRef = Arc::new(StringArray::from(vec![
            EVENT_TYPE_MEMPOOL_ACCEPT;
            events.len()
        ]));
        let host: ArrayRef = Arc::new(StringArray::from(vec![
            self.config.host.as_str();
            events.len()
        ]));
        let timestamp: ArrayRef = Arc::new(
            TimestampMicrosecondArray::from(
                events
                    .iter()
                    .map(|e| e.timestamp.timestamp_micros())
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        );
        let txhash: ArrayRef = Arc::new(StringArray::from(
            events.iter().map(|e| e.txid.as_str()).collect::<Vec<_>>(),
        ));
        let peer_num: ArrayRef = Arc::new(Int32Array::from(
            events
                .iter()
                .map(|e| Some(e.peer_num as i32))
                .collect::<Vec<_>>(),
        ));
        let pool_size_txns: ArrayRef = Arc::new(Int32Array::from(
            events
                .iter()
                .map(|e| Some(e.pool_size_txns as i32))
                .collect::<Vec<_>>(),
        ));
        let pool_size_kb: ArrayRef = Arc::new(Int32Array::from(
            events
                .iter()
                .map(|e| Some(e.pool_size_kb as i32))
                .collect::<Vec<_>>(),
        ));
        let replace_txhash: ArrayRef = Arc::new(StringArray::from(
            events
                .iter()
                .map(|e| e.replaced_txid.as_deref())
                .collect::<Vec<_>>(),
        ));

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                event_type,
                host,
                timestamp,
                txhash,
                peer_num,
                pool_size_txns,
                pool_size_kb,
                replace_txhash,
            ],
        )?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(buf)
    }

    /// Object path for a flush performed at `flushed_at`.
    fn object_path(&self, flushed_at: DateTime<Utc>) -> ObjectPath {
        let filename = format!(
            "{}.{}.parquet",
            self.config.host,
            flushed_at.format("%Y-%m-%dT%H-%M-%S")
        );
        ObjectPath::from(format!(
            "source={}/dt={}/{}",
            self.config.source,
            flushed_at.format("%Y-%m-%d"),
            filename
        ))
    }
}

#[async_trait]
impl BatchSink for ParquetSink {
    fn name(&self) -> &'static str {
        "parquet"
    }

    async fn deliver(&mut self, events: Vec<AcceptEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let flushed_at = Utc::now();
        let encoded = self.encode(&events)?;
        let path = self.object_path(flushed_at);
        let size = encoded.len();

        self.store.put(&path, PutPayload::from(encoded)).await?;

        counter!("parquet_uploads_total").increment(1);
        counter!("parquet_bytes_total").increment(size as u64);
        info!("Uploaded {} with {} records ({} bytes)", path, events.len(), size);

        Ok(())
    }
}
