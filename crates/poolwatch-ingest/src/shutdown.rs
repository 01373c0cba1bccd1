//! Cooperative shutdown signal shared between the signal handler and the run
//! loop.
//!
//! The lifecycle controller owns the flag; the read loop observes it once per
//! iteration, so shutdown latency is bounded by one line-processing iteration
//! plus the poll interval. Triggering is idempotent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clonable shutdown flag set from the SIGINT/SIGTERM handler.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Safe to call from a signal handler; repeated calls
    /// have no additional effect.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
