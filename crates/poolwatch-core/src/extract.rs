//! Pattern extraction from raw debug-log lines.
//!
//! Each line is tried against the replacement pattern first, then the
//! acceptance pattern. First match wins; a line matching neither produces no
//! event. The patterns target bitcoind's `AcceptToMemoryPool` and RBF
//! replacement log lines:
//!
//! ```text
//! 2024-01-01T00:00:00.123456Z [msghand] AcceptToMemoryPool: peer=7: accepted <txid> (poolsz 120 txn, 4500 kB)
//! 2024-01-01T00:00:00.123456Z [msghand] replacing mempool tx <old> (...). New tx <new> (...)
//! ```

use crate::error::{Error, Result};
use crate::event::{AcceptEvent, LogEvent, ReplaceEvent};
use chrono::NaiveDateTime;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Matches an RBF replacement line and captures the superseded ("old") and
/// superseding ("new") transaction ids.
static REPLACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"replacing mempool tx (?P<old>[a-f0-9]{64}).*?New tx (?P<new>[a-f0-9]{64})")
        .expect("replacement pattern compiles")
});

/// Matches a mempool acceptance line and captures timestamp, peer, txid, and
/// pool size after acceptance.
static ACCEPT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<timestamp>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+Z).*?peer=(?P<peer_num>\d+): accepted (?P<txhash>[a-f0-9]{64}).*?poolsz (?P<pool_size_txns>\d+) txn, (?P<pool_size_kb>\d+) kB",
    )
    .expect("acceptance pattern compiles")
});

/// Timestamp layout used by bitcoind with `-logtimemicros`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Extract at most one typed event from a raw log line.
///
/// Returns `Ok(None)` for lines matching neither pattern. The replacement
/// pattern is tried first and short-circuits; a line is never tested against
/// both. A matched line whose captured fields fail timestamp or numeric
/// conversion is an error (the caller treats this as fatal).
pub fn extract(line: &str) -> Result<Option<LogEvent>> {
    if let Some(caps) = REPLACE_PATTERN.captures(line) {
        return Ok(Some(LogEvent::Replace(ReplaceEvent {
            old_txid: caps["old"].to_string(),
            new_txid: caps["new"].to_string(),
        })));
    }

    if let Some(caps) = ACCEPT_PATTERN.captures(line) {
        let timestamp = NaiveDateTime::parse_from_str(&caps["timestamp"], TIMESTAMP_FORMAT)?;
        return Ok(Some(LogEvent::Accept(AcceptEvent {
            timestamp: timestamp.and_utc(),
            txid: caps["txhash"].to_string(),
            peer_num: parse_u32(&caps, "peer_num")?,
            pool_size_txns: parse_u32(&caps, "pool_size_txns")?,
            pool_size_kb: parse_u32(&caps, "pool_size_kb")?,
            replaced_txid: None,
        })));
    }

    Ok(None)
}

fn parse_u32(caps: &Captures<'_>, field: &'static str) -> Result<u32> {
    caps[field].parse().map_err(|e: std::num::ParseIntError| {
        Error::InvalidField {
            field,
            reason: e.to_string(),
        }
    })
}
