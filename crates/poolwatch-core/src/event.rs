//! Event model for mempool activity extracted from the node debug log.
//!
//! Two event shapes come out of extraction:
//!
//! - [`AcceptEvent`] - a transaction entered the mempool. These are buffered
//!   and shipped to the sink.
//! - [`ReplaceEvent`] - a new transaction superseded an existing one
//!   (fee-bump). These are consumed immediately into correlator state and are
//!   never shipped on their own; their linkage surfaces as
//!   [`AcceptEvent::replaced_txid`] on the matching acceptance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed `event_type` discriminator carried on every outgoing record.
pub const EVENT_TYPE_MEMPOOL_ACCEPT: &str = "mempool_accept";

/// A transaction accepted into the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptEvent {
    /// Log timestamp, microsecond precision, UTC.
    pub timestamp: DateTime<Utc>,

    /// 64-hex-character transaction id.
    pub txid: String,

    /// Peer the transaction was received from.
    pub peer_num: u32,

    /// Mempool size in transactions after acceptance.
    pub pool_size_txns: u32,

    /// Mempool size in kilobytes after acceptance.
    pub pool_size_kb: u32,

    /// The transaction this one replaced, if a replacement log line for this
    /// txid was observed before the acceptance was finalized.
    pub replaced_txid: Option<String>,
}

/// A mempool replacement observed in the log.
///
/// Ephemeral: recorded into the correlator, never batched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceEvent {
    /// The superseded transaction.
    pub old_txid: String,

    /// The superseding transaction.
    pub new_txid: String,
}

/// A typed event extracted from one raw log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// Transaction accepted into the mempool.
    Accept(AcceptEvent),
    /// Transaction replaced in the mempool.
    Replace(ReplaceEvent),
}

/// Outgoing JSON message for the publish/subscribe sink variant.
///
/// One message per [`AcceptEvent`], keyed by `txhash` on the topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolMessage {
    pub event_type: String,
    pub host: String,
    /// ISO-8601 UTC timestamp with microsecond fraction, as seen in the log.
    pub timestamp: String,
    pub txhash: String,
    pub peer_num: u32,
    pub pool_size_txns: u32,
    pub pool_size_kb: u32,
    pub replace_txhash: Option<String>,
    pub source: String,
    /// Partition date (`YYYY-MM-DD`) stamped at publish time.
    pub dt: String,
}

impl MempoolMessage {
    /// Build the outgoing message for one accepted transaction.
    ///
    /// `published_at` stamps the `dt` partition key; the event timestamp is
    /// re-rendered in the log's own ISO-8601 microsecond format.
    pub fn new(event: &AcceptEvent, host: &str, source: &str, published_at: DateTime<Utc>) -> Self {
        Self {
            event_type: EVENT_TYPE_MEMPOOL_ACCEPT.to_string(),
            host: host.to_string(),
            timestamp: event
                .timestamp
                .format("%Y-%m-%dT%H:%M:%S%.6fZ")
                .to_string(),
            txhash: event.txid.clone(),
            peer_num: event.peer_num,
            pool_size_txns: event.pool_size_txns,
            pool_size_kb: event.pool_size_kb,
            replace_txhash: event.replaced_txid.clone(),
            source: source.to_string(),
            dt: published_at.format("%Y-%m-%d").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> AcceptEvent {
        AcceptEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::microseconds(123_456),
            txid: "aa".repeat(32),
            peer_num: 7,
            pool_size_txns: 120,
            pool_size_kb: 4500,
            replaced_txid: None,
        }
    }

    #[test]
    fn test_message_carries_all_keys() {
        let event = sample_event();
        let published_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let msg = MempoolMessage::new(&event, "node-1", "mainnet", published_at);

        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event_type"], "mempool_accept");
        assert_eq!(json["host"], "node-1");
        assert_eq!(json["timestamp"], "2024-01-01T00:00:00.123456Z");
        assert_eq!(json["txhash"], "aa".repeat(32));
        assert_eq!(json["peer_num"], 7);
        assert_eq!(json["pool_size_txns"], 120);
        assert_eq!(json["pool_size_kb"], 4500);
        assert_eq!(json["replace_txhash"], serde_json::Value::Null);
        assert_eq!(json["source"], "mainnet");
        assert_eq!(json["dt"], "2024-01-02");
    }

    #[test]
    fn test_message_includes_replacement_linkage() {
        let mut event = sample_event();
        event.replaced_txid = Some("bb".repeat(32));
        let msg = MempoolMessage::new(&event, "node-1", "mainnet", Utc::now());
        assert_eq!(msg.replace_txhash.as_deref(), Some("bb".repeat(32).as_str()));
    }
}
