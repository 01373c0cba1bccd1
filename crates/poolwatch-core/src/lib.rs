//! Core types, log-line extraction, and shared utilities for the poolwatch
//! pipeline.
//!
//! This crate provides:
//! - The mempool event model (acceptances, replacements, outgoing records)
//! - Regex extraction of typed events from raw debug-log lines
//! - Prometheus metrics helpers
//! - Shared error types

mod error;
mod event;
pub mod extract;
pub mod metrics;

pub use error::{Error, Result};
pub use event::{
    AcceptEvent, EVENT_TYPE_MEMPOOL_ACCEPT, LogEvent, MempoolMessage, ReplaceEvent,
};
pub use extract::extract;
