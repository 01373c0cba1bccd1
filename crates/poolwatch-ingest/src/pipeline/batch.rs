//! Ordered buffer of finalized events awaiting delivery.
//!
//! Events append in arrival order and leave only through [`BatchBuffer::take`],
//! which drains the full contents as one unit. The flush clock starts at
//! construction and resets on every `take`, so the interval trigger measures
//! time since the last flush, not time since the first buffered event.

use poolwatch_core::AcceptEvent;
use std::time::{Duration, Instant};

/// Append-only event buffer with an elapsed-time flush trigger.
pub struct BatchBuffer {
    events: Vec<AcceptEvent>,
    flush_interval: Duration,
    last_flush: Instant,
}

impl BatchBuffer {
    pub fn new(flush_interval: Duration) -> Self {
        Self {
            events: Vec::new(),
            flush_interval,
            last_flush: Instant::now(),
        }
    }

    /// Append one event at the tail.
    pub fn push(&mut self, event: AcceptEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether more than the configured interval has elapsed since the last
    /// flush.
    pub fn interval_elapsed(&self) -> bool {
        self.last_flush.elapsed() > self.flush_interval
    }

    /// Drain the entire buffer as one unit and reset the flush clock.
    ///
    /// The clock resets even when the buffer is empty: an empty flush is a
    /// no-op for delivery but still restarts the interval.
    pub fn take(&mut self) -> Vec<AcceptEvent> {
        self.last_flush = Instant::now();
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(n: u8) -> AcceptEvent {
        AcceptEvent {
            timestamp: Utc::now(),
            txid: format!("{:02x}", n).repeat(32),
            peer_num: n as u32,
            pool_size_txns: 1,
            pool_size_kb: 1,
            replaced_txid: None,
        }
    }

    #[test]
    fn test_take_preserves_arrival_order_and_clears() {
        let mut buffer = BatchBuffer::new(Duration::from_secs(3600));
        buffer.push(event(1));
        buffer.push(event(2));
        buffer.push(event(3));
        assert_eq!(buffer.len(), 3);

        let drained = buffer.take();
        assert_eq!(
            drained.iter().map(|e| e.peer_num).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_on_empty_buffer_yields_nothing() {
        let mut buffer = BatchBuffer::new(Duration::from_secs(3600));
        assert!(buffer.take().is_empty());
    }

    #[test]
    fn test_interval_trigger() {
        let buffer = BatchBuffer::new(Duration::ZERO);
        assert!(buffer.interval_elapsed());

        let buffer = BatchBuffer::new(Duration::from_secs(3600));
        assert!(!buffer.interval_elapsed());
    }

    #[test]
    fn test_take_resets_the_flush_clock() {
        let mut buffer = BatchBuffer::new(Duration::from_secs(3600));
        buffer.push(event(1));
        buffer.take();
        assert!(!buffer.interval_elapsed());
    }

    #[test]
    fn test_no_event_lost_or_duplicated_across_flushes() {
        let mut buffer = BatchBuffer::new(Duration::ZERO);
        buffer.push(event(1));
        buffer.push(event(2));
        let first = buffer.take();

        buffer.push(event(3));
        let second = buffer.take();

        let all: Vec<u32> = first
            .iter()
            .chain(second.iter())
            .map(|e| e.peer_num)
            .collect();
        assert_eq!(all, vec![1, 2, 3]);
    }
}
