//! The lifecycle controller driving the tail → extract → correlate → buffer
//! loop.
//!
//! One logical worker per watched file: a line is fully processed before the
//! next is pulled, so the correlator and batch buffer have exactly one
//! mutator and need no locking. The loop checks the shutdown flag once per
//! iteration and sleeps the poll interval when the source has no data, so
//! shutdown latency is bounded by one iteration plus the poll interval.
//!
//! Phases:
//! 1. Running: pull, extract, correlate, buffer; flush when the interval
//!    trigger fires.
//! 2. Draining (entered exactly once on shutdown): one unconditional final
//!    flush, then the sink's drain barrier. A failure here is logged and the
//!    daemon still exits, carrying the error out as a non-zero exit code.

use crate::pipeline::{BatchBuffer, BatchSink, ReplacementCorrelator};
use crate::shutdown::ShutdownFlag;
use crate::source::LineSource;
use crate::Result;
use metrics::{counter, gauge};
use poolwatch_core::{LogEvent, extract};
use std::time::Duration;
use tracing::{debug, error, info};

/// Tuning for the run loop.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Sleep between polls when the source has no data.
    pub poll_interval: Duration,

    /// Elapsed time since the last flush that triggers a new one.
    pub flush_interval: Duration,

    /// Optional cap on unresolved replacement linkages (`None` = unbounded).
    pub max_replacements: Option<usize>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            flush_interval: Duration::from_secs(3600),
            max_replacements: None,
        }
    }
}

/// Counters from one run, logged in the shutdown summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub lines_read: usize,
    pub accepts_extracted: usize,
    pub replacements_recorded: usize,
    pub replacements_resolved: usize,
    pub batches_flushed: usize,
    pub events_shipped: usize,
    /// Linkages still unresolved at shutdown (the known correlator leak).
    pub unresolved_replacements: usize,
}

/// Drives one line source into one sink until shutdown.
pub struct Watcher<S> {
    source: S,
    sink: Box<dyn BatchSink>,
    shutdown: ShutdownFlag,
    correlator: ReplacementCorrelator,
    batch: BatchBuffer,
    poll_interval: Duration,
    stats: RunStats,
}

impl<S: LineSource> Watcher<S> {
    pub fn new(
        source: S,
        sink: Box<dyn BatchSink>,
        shutdown: ShutdownFlag,
        config: WatcherConfig,
    ) -> Self {
        Self {
            source,
            sink,
            shutdown,
            correlator: ReplacementCorrelator::with_capacity_bound(config.max_replacements),
            batch: BatchBuffer::new(config.flush_interval),
            poll_interval: config.poll_interval,
            stats: RunStats::default(),
        }
    }

    /// Run until the shutdown flag is triggered, then drain.
    pub async fn run(mut self) -> Result<RunStats> {
        info!(
            "Ingesting from {} source into {} sink...",
            self.source.name(),
            self.sink.name()
        );

        while !self.shutdown.is_triggered() {
            match self.source.next_line()? {
                Some(line) => self.process_line(&line)?,
                None => tokio::time::sleep(self.poll_interval).await,
            }

            if self.batch.interval_elapsed() {
                self.flush().await?;
            }
        }

        info!("Shutdown requested, draining...");
        let mut drain_error = None;
        if let Err(e) = self.flush().await {
            error!("Final flush failed: {}", e);
            drain_error = Some(e);
        }
        if let Err(e) = self.sink.drain().await {
            error!("Error while draining sink: {}", e);
            drain_error.get_or_insert(e);
        }

        self.stats.unresolved_replacements = self.correlator.len();

        match drain_error {
            None => {
                info!("Drain complete");
                Ok(self.stats)
            }
            Some(e) => Err(e),
        }
    }

    fn process_line(&mut self, line: &str) -> Result<()> {
        self.stats.lines_read += 1;
        counter!("ingest_lines_total").increment(1);

        match extract(line)? {
            Some(LogEvent::Replace(replacement)) => {
                debug!(
                    "Recording replacement {} -> {}",
                    replacement.new_txid, replacement.old_txid
                );
                self.correlator
                    .record_replacement(replacement.old_txid, replacement.new_txid);
                self.stats.replacements_recorded += 1;
                counter!("ingest_replacements_total").increment(1);
                gauge!("correlator_entries").set(self.correlator.len() as f64);
            }
            Some(LogEvent::Accept(mut event)) => {
                event.replaced_txid = self.correlator.resolve_and_consume(&event.txid);
                if event.replaced_txid.is_some() {
                    self.stats.replacements_resolved += 1;
                    counter!("ingest_replacements_resolved_total").increment(1);
                    gauge!("correlator_entries").set(self.correlator.len() as f64);
                }

                self.batch.push(event);
                self.stats.accepts_extracted += 1;
                counter!("ingest_accepts_total").increment(1);
                gauge!("batch_buffered_events").set(self.batch.len() as f64);
            }
            None => {}
        }

        Ok(())
    }

    /// Hand the entire buffer to the sink as one unit. No-op when empty; the
    /// flush clock resets either way.
    async fn flush(&mut self) -> Result<()> {
        let events = self.batch.take();
        gauge!("batch_buffered_events").set(0.0);
        if events.is_empty() {
            debug!("Flush skipped: buffer empty");
            return Ok(());
        }

        let count = events.len();
        self.sink.deliver(events).await?;

        self.stats.batches_flushed += 1;
        self.stats.events_shipped += count;
        counter!("flush_total").increment(1);
        counter!("flush_events_total").increment(count as u64);
        info!("Flushed {} events to {} sink", count, self.sink.name());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use poolwatch_core::AcceptEvent;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Yields scripted lines, then triggers shutdown once exhausted
    /// (simulating a signal arriving mid-run).
    struct ScriptedSource {
        lines: VecDeque<String>,
        shutdown: ShutdownFlag,
    }

    impl ScriptedSource {
        fn new(lines: &[String], shutdown: ShutdownFlag) -> Self {
            Self {
                lines: lines.iter().cloned().collect(),
                shutdown,
            }
        }
    }

    impl LineSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn next_line(&mut self) -> Result<Option<String>> {
            match self.lines.pop_front() {
                Some(line) => Ok(Some(line)),
                None => {
                    self.shutdown.trigger();
                    Ok(None)
                }
            }
        }
    }

    /// Records every delivered batch and counts drain calls.
    #[derive(Clone, Default)]
    struct RecordingSink {
        batches: Arc<Mutex<Vec<Vec<AcceptEvent>>>>,
        drains: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BatchSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn deliver(&mut self, events: Vec<AcceptEvent>) -> Result<()> {
            self.batches.lock().unwrap().push(events);
            Ok(())
        }

        async fn drain(&mut self) -> Result<()> {
            self.drains.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn accept_line(txid: &str, peer: u32) -> String {
        format!(
            "2024-01-01T00:00:00.123456Z [msghand] AcceptToMemoryPool: peer={peer}: accepted {txid} (poolsz 120 txn, 4500 kB)"
        )
    }

    fn replace_line(old: &str, new: &str) -> String {
        format!(
            "2024-01-01T00:00:01.000001Z [msghand] replacing mempool tx {old} (fees=1000). New tx {new} (fees=2000)"
        )
    }

    fn test_config() -> WatcherConfig {
        WatcherConfig {
            poll_interval: Duration::from_millis(1),
            flush_interval: Duration::from_secs(3600),
            max_replacements: None,
        }
    }

    #[tokio::test]
    async fn test_shutdown_flushes_buffered_events_once_in_order() {
        let shutdown = ShutdownFlag::new();
        let lines = vec![
            accept_line(&"01".repeat(32), 1),
            "noise line with no event".to_string(),
            accept_line(&"02".repeat(32), 2),
            accept_line(&"03".repeat(32), 3),
        ];
        let source = ScriptedSource::new(&lines, shutdown.clone());
        let sink = RecordingSink::default();

        let watcher = Watcher::new(source, Box::new(sink.clone()), shutdown, test_config());
        let stats = watcher.run().await.unwrap();

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1, "exactly one flush expected");
        let txids: Vec<&str> = batches[0].iter().map(|e| e.txid.as_str()).collect();
        assert_eq!(
            txids,
            vec!["01".repeat(32), "02".repeat(32), "03".repeat(32)]
        );
        assert_eq!(sink.drains.load(Ordering::SeqCst), 1);

        assert_eq!(stats.lines_read, 4);
        assert_eq!(stats.accepts_extracted, 3);
        assert_eq!(stats.batches_flushed, 1);
        assert_eq!(stats.events_shipped, 3);
    }

    #[tokio::test]
    async fn test_replacement_linkage_attaches_to_following_acceptance() {
        let shutdown = ShutdownFlag::new();
        let old = "aa".repeat(32);
        let new = "bb".repeat(32);
        let lines = vec![replace_line(&old, &new), accept_line(&new, 5)];
        let source = ScriptedSource::new(&lines, shutdown.clone());
        let sink = RecordingSink::default();

        let watcher = Watcher::new(source, Box::new(sink.clone()), shutdown, test_config());
        let stats = watcher.run().await.unwrap();

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].txid, new);
        assert_eq!(batches[0][0].replaced_txid.as_deref(), Some(old.as_str()));

        assert_eq!(stats.replacements_recorded, 1);
        assert_eq!(stats.replacements_resolved, 1);
        assert_eq!(stats.unresolved_replacements, 0);
    }

    #[tokio::test]
    async fn test_acceptance_without_replacement_has_no_linkage() {
        let shutdown = ShutdownFlag::new();
        let lines = vec![accept_line(&"0f".repeat(32), 9)];
        let source = ScriptedSource::new(&lines, shutdown.clone());
        let sink = RecordingSink::default();

        let watcher = Watcher::new(source, Box::new(sink.clone()), shutdown, test_config());
        watcher.run().await.unwrap();

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches[0][0].replaced_txid, None);
    }

    #[tokio::test]
    async fn test_unmatched_replacement_stays_unresolved() {
        let shutdown = ShutdownFlag::new();
        let lines = vec![
            replace_line(&"aa".repeat(32), &"bb".repeat(32)),
            accept_line(&"cc".repeat(32), 2),
        ];
        let source = ScriptedSource::new(&lines, shutdown.clone());
        let sink = RecordingSink::default();

        let watcher = Watcher::new(source, Box::new(sink.clone()), shutdown, test_config());
        let stats = watcher.run().await.unwrap();

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches[0][0].replaced_txid, None);
        assert_eq!(stats.unresolved_replacements, 1);
    }

    #[tokio::test]
    async fn test_empty_shutdown_performs_no_delivery() {
        let shutdown = ShutdownFlag::new();
        let source = ScriptedSource::new(&[], shutdown.clone());
        let sink = RecordingSink::default();

        let watcher = Watcher::new(source, Box::new(sink.clone()), shutdown, test_config());
        let stats = watcher.run().await.unwrap();

        assert!(sink.batches.lock().unwrap().is_empty());
        assert_eq!(sink.drains.load(Ordering::SeqCst), 1);
        assert_eq!(stats.batches_flushed, 0);
    }

    #[tokio::test]
    async fn test_interval_flushes_neither_drop_nor_duplicate() {
        let shutdown = ShutdownFlag::new();
        let lines: Vec<String> = (1..=5u8)
            .map(|n| accept_line(&format!("{:02x}", n).repeat(32), n as u32))
            .collect();
        let source = ScriptedSource::new(&lines, shutdown.clone());
        let sink = RecordingSink::default();

        let config = WatcherConfig {
            flush_interval: Duration::ZERO,
            ..test_config()
        };
        let watcher = Watcher::new(source, Box::new(sink.clone()), shutdown, config);
        let stats = watcher.run().await.unwrap();

        let batches = sink.batches.lock().unwrap();
        let all: Vec<u32> = batches.iter().flatten().map(|e| e.peer_num).collect();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
        assert_eq!(stats.events_shipped, 5);
        // With a zero interval every event flushes on its own.
        assert_eq!(batches.len(), 5);
    }

    #[tokio::test]
    async fn test_malformed_capture_is_fatal() {
        let shutdown = ShutdownFlag::new();
        let lines = vec![format!(
            "2024-01-01T00:00:00.123456Z peer=99999999999999999999: accepted {} (poolsz 1 txn, 2 kB)",
            "0a".repeat(32)
        )];
        let source = ScriptedSource::new(&lines, shutdown.clone());
        let sink = RecordingSink::default();

        let watcher = Watcher::new(source, Box::new(sink.clone()), shutdown, test_config());
        let err = watcher.run().await.unwrap_err();
        assert!(matches!(err, Error::Extract(_)));
    }
}
