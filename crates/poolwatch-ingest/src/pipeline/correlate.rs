//! Replacement-to-acceptance correlation state.
//!
//! A replacement log line arrives before the acceptance of the transaction
//! that caused it, so the linkage is held here keyed by the new transaction
//! id until the matching acceptance consumes it. Entries whose acceptance
//! never arrives stay in the map forever by default; this mirrors the node's
//! observed behavior and is a documented leak. An optional capacity bound
//! evicts the oldest unresolved entry instead (off by default).

use std::collections::{HashMap, VecDeque};

/// Pending linkage for one superseding transaction.
struct PendingEntry {
    old_txid: String,
    /// Insertion sequence; an overwrite refreshes it, so eviction age is
    /// measured from the most recent replacement for this txid.
    seq: u64,
}

/// Maps `new_txid -> old_txid` for replacements not yet matched to an
/// acceptance.
pub struct ReplacementCorrelator {
    entries: HashMap<String, PendingEntry>,
    /// Insertion order for eviction; may hold stale (overwritten or consumed)
    /// keys, skipped lazily by sequence check.
    order: VecDeque<(u64, String)>,
    next_seq: u64,
    max_entries: Option<usize>,
    stats: CorrelatorStats,
}

/// Counters for the correlator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    /// Replacements recorded (including overwrites).
    pub recorded: usize,
    /// Linkages consumed by a matching acceptance.
    pub resolved: usize,
    /// Entries discarded by the capacity bound.
    pub evicted: usize,
}

impl ReplacementCorrelator {
    /// Unbounded correlator, matching the node's observed pairing behavior.
    pub fn new() -> Self {
        Self::with_capacity_bound(None)
    }

    /// Correlator that keeps at most `max_entries` unresolved linkages,
    /// evicting the oldest when full. `None` disables eviction.
    pub fn with_capacity_bound(max_entries: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
            max_entries,
            stats: CorrelatorStats::default(),
        }
    }

    /// Record `new_txid -> old_txid`, unconditionally overwriting any prior
    /// linkage for `new_txid` (last write wins, no history kept).
    pub fn record_replacement(&mut self, old_txid: String, new_txid: String) {
        if let Some(cap) = self.max_entries
            && !self.entries.contains_key(&new_txid)
            && self.entries.len() >= cap
        {
            self.evict_oldest();
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(prev) = self.entries.insert(
            new_txid.clone(),
            PendingEntry {
                old_txid,
                seq,
            },
        ) {
            tracing::debug!(
                "replacement for {} overwrote pending linkage to {}",
                new_txid,
                prev.old_txid
            );
        }
        self.order.push_back((seq, new_txid));
        self.stats.recorded += 1;
    }

    /// Look up and remove the pending linkage for `txid`.
    ///
    /// A true consume: a second call for the same id returns `None`.
    pub fn resolve_and_consume(&mut self, txid: &str) -> Option<String> {
        let entry = self.entries.remove(txid)?;
        self.stats.resolved += 1;
        Some(entry.old_txid)
    }

    /// Unresolved linkages currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CorrelatorStats {
        self.stats
    }

    fn evict_oldest(&mut self) {
        while let Some((seq, key)) = self.order.pop_front() {
            // Stale queue entries (consumed, or overwritten with a newer
            // sequence) are skipped.
            let live = self.entries.get(&key).is_some_and(|e| e.seq == seq);
            if live {
                self.entries.remove(&key);
                self.stats.evicted += 1;
                tracing::debug!("evicted unresolved replacement linkage for {}", key);
                return;
            }
        }
    }
}

impl Default for ReplacementCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txid(n: u8) -> String {
        format!("{:02x}", n).repeat(32)
    }

    #[test]
    fn test_resolve_is_a_true_consume() {
        let mut correlator = ReplacementCorrelator::new();
        correlator.record_replacement(txid(1), txid(2));

        assert_eq!(correlator.resolve_and_consume(&txid(2)), Some(txid(1)));
        assert_eq!(correlator.resolve_and_consume(&txid(2)), None);
        assert!(correlator.is_empty());
    }

    #[test]
    fn test_unknown_txid_resolves_to_nothing() {
        let mut correlator = ReplacementCorrelator::new();
        assert_eq!(correlator.resolve_and_consume(&txid(9)), None);
    }

    #[test]
    fn test_last_write_wins_on_duplicate_new_txid() {
        let mut correlator = ReplacementCorrelator::new();
        correlator.record_replacement(txid(1), txid(5));
        correlator.record_replacement(txid(2), txid(5));

        assert_eq!(correlator.len(), 1);
        assert_eq!(correlator.resolve_and_consume(&txid(5)), Some(txid(2)));
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut correlator = ReplacementCorrelator::new();
        for n in 0..200 {
            correlator.record_replacement(txid(0), format!("{:02x}", n).repeat(32));
        }
        assert_eq!(correlator.len(), 200);
        assert_eq!(correlator.stats().evicted, 0);
    }

    #[test]
    fn test_capacity_bound_evicts_oldest() {
        let mut correlator = ReplacementCorrelator::with_capacity_bound(Some(2));
        correlator.record_replacement(txid(1), txid(11));
        correlator.record_replacement(txid(2), txid(12));
        correlator.record_replacement(txid(3), txid(13));

        assert_eq!(correlator.len(), 2);
        assert_eq!(correlator.stats().evicted, 1);
        // Oldest entry is gone, newer two survive.
        assert_eq!(correlator.resolve_and_consume(&txid(11)), None);
        assert_eq!(correlator.resolve_and_consume(&txid(12)), Some(txid(2)));
        assert_eq!(correlator.resolve_and_consume(&txid(13)), Some(txid(3)));
    }

    #[test]
    fn test_overwrite_refreshes_eviction_age() {
        let mut correlator = ReplacementCorrelator::with_capacity_bound(Some(2));
        correlator.record_replacement(txid(1), txid(11));
        correlator.record_replacement(txid(2), txid(12));
        // Refresh the first entry, making txid(12) the oldest.
        correlator.record_replacement(txid(3), txid(11));
        correlator.record_replacement(txid(4), txid(14));

        assert_eq!(correlator.resolve_and_consume(&txid(12)), None);
        assert_eq!(correlator.resolve_and_consume(&txid(11)), Some(txid(3)));
        assert_eq!(correlator.resolve_and_consume(&txid(14)), Some(txid(4)));
    }

    #[test]
    fn test_consumed_entries_do_not_block_eviction() {
        let mut correlator = ReplacementCorrelator::with_capacity_bound(Some(2));
        correlator.record_replacement(txid(1), txid(11));
        correlator.record_replacement(txid(2), txid(12));
        correlator.resolve_and_consume(&txid(11));

        // Capacity has room again; nothing should be evicted.
        correlator.record_replacement(txid(3), txid(13));
        assert_eq!(correlator.stats().evicted, 0);
        assert_eq!(correlator.len(), 2);
    }
}
