//! Mempool event ingestion daemon.
//!
//! Tails a bitcoind debug log, extracts mempool acceptance and replacement
//! events, correlates replacement linkage onto acceptances, buffers them, and
//! ships batches to an external sink with a guaranteed final flush on
//! shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ LogFollower  │  tails the debug log from end-of-file forward
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │   extract    │  replacement pattern first, then acceptance
//! └──────┬───────┘
//!        ▼
//! ┌──────────────────────┐
//! │ ReplacementCorrelator│  new_txid -> old_txid until acceptance consumes it
//! └──────┬───────────────┘
//!        ▼
//! ┌──────────────┐
//! │ BatchBuffer  │  ordered, flushed on interval and on shutdown
//! └──────┬───────┘
//!        ▼
//! ┌──────────────────────────┐
//! │ ParquetSink / KafkaSink  │  columnar upload or per-event publish
//! └──────────────────────────┘
//! ```
//!
//! The batch is the unit of delivery: a flush hands the entire buffer to the
//! sink in arrival order, and shutdown drains both the buffer and any
//! in-flight publishes before the process exits.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod run;
pub mod shutdown;
pub mod source;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

pub use config::{Config, SinkKind, SinkSettings};
pub use pipeline::{
    BatchBuffer, BatchSink, CorrelatorStats, KafkaSink, KafkaSinkConfig, ParquetSink,
    ParquetSinkConfig, ReplacementCorrelator,
};
pub use run::{RunStats, Watcher, WatcherConfig};
pub use shutdown::ShutdownFlag;
pub use source::{LineSource, LogFollower};
