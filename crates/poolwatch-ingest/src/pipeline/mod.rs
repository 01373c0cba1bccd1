//! Core pipeline components for mempool event ingestion.
//!
//! This module provides the shared pipeline the tailed log feeds into:
//!
//! - [`ReplacementCorrelator`] - links replacement lines to the acceptance
//!   that follows them
//! - [`BatchBuffer`] - ordered buffer of finalized events with timed flush
//! - [`ParquetSink`] / [`KafkaSink`] - delivery adapters
//!
//! # Architecture
//!
//! ```text
//! [LogFollower] → [extract] → [ReplacementCorrelator] → [BatchBuffer]
//!                                                            ↓ flush
//!                                          [ParquetSink] or [KafkaSink]
//! ```

mod batch;
mod correlate;
mod kafka;
mod parquet;

pub use batch::BatchBuffer;
pub use correlate::{CorrelatorStats, ReplacementCorrelator};
pub use kafka::{KafkaSink, KafkaSinkConfig};
pub use parquet::{ParquetSink, ParquetSinkConfig};

use crate::Result;
use async_trait::async_trait;
use poolwatch_core::AcceptEvent;

/// A delivery adapter consuming finalized batches.
///
/// `deliver` receives the entire current buffer contents as one unit, in
/// arrival order; a successful call means the batch is durably handed off (or
/// queued with its acknowledgments tracked, for sinks that publish
/// asynchronously). `drain` blocks until every in-flight delivery is
/// acknowledged; the lifecycle controller calls it exactly once during
/// shutdown, after the final flush.
#[async_trait]
pub trait BatchSink: Send {
    /// Human-readable name for this sink (used in logs).
    fn name(&self) -> &'static str;

    /// Deliver one batch. Never called with an empty batch.
    async fn deliver(&mut self, events: Vec<AcceptEvent>) -> Result<()>;

    /// Wait for all in-flight deliveries to complete.
    async fn drain(&mut self) -> Result<()> {
        Ok(())
    }
}
