//! Kafka sink: publishes one JSON message per accepted transaction.
//!
//! Publishing is asynchronous. Each message's delivery future is spawned as a
//! task and tracked in a bounded in-flight set; completed handles are reaped
//! opportunistically on every delivery, and once the bound is hit the oldest
//! outstanding publish is awaited before queueing more. A failed publish is
//! logged and the message dropped (no retry). `drain` awaits every
//! outstanding handle, so shutdown does not complete until the broker has
//! acknowledged (or rejected) everything queued.

use super::BatchSink;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use metrics::{counter, gauge};
use poolwatch_core::{AcceptEvent, MempoolMessage};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for the Kafka sink.
#[derive(Debug, Clone)]
pub struct KafkaSinkConfig {
    /// Comma-separated broker list.
    pub brokers: String,

    /// Topic to publish to.
    pub topic: String,

    /// Host identifier stamped on every message.
    pub host: String,

    /// Source label stamped on every message.
    pub source: String,

    /// Maximum publishes awaiting acknowledgment before `deliver` applies
    /// backpressure.
    pub max_in_flight: usize,

    /// Producer-side delivery timeout in milliseconds.
    pub message_timeout_ms: u32,
}

impl Default for KafkaSinkConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: "mempool-events".to_string(),
            host: String::new(),
            source: String::new(),
            max_in_flight: 1000,
            message_timeout_ms: 30_000,
        }
    }
}

/// Publish/subscribe sink backed by a Kafka topic.
pub struct KafkaSink {
    producer: FutureProducer,
    config: KafkaSinkConfig,
    in_flight: Vec<JoinHandle<()>>,
}

impl KafkaSink {
    /// Create the producer and connect to the brokers.
    pub fn connect(config: KafkaSinkConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .set("compression.type", "snappy")
            .set("acks", "all")
            .set("linger.ms", "100")
            .create()?;

        info!(
            "Kafka sink initialized: brokers={}, topic={}",
            config.brokers, config.topic
        );

        Ok(Self {
            producer,
            config,
            in_flight: Vec::new(),
        })
    }

    /// Queue one message and track its delivery future.
    async fn publish(&mut self, event: &AcceptEvent) -> Result<()> {
        let message = MempoolMessage::new(event, &self.config.host, &self.config.source, Utc::now());
        let payload = serde_json::to_string(&message)?;

        // Reap completed handles, then apply backpressure at the bound.
        self.in_flight.retain(|handle| !handle.is_finished());
        while self.in_flight.len() >= self.config.max_in_flight {
            self.in_flight.remove(0).await?;
            self.in_flight.retain(|handle| !handle.is_finished());
        }

        let producer = self.producer.clone();
        let topic = self.config.topic.clone();
        let key = event.txid.clone();

        let handle = tokio::spawn(async move {
            let record = FutureRecord::to(&topic).key(&key).payload(&payload);
            match producer.send(record, Timeout::Never).await {
                Ok(delivery) => {
                    counter!("kafka_published_total").increment(1);
                    debug!("Published txhash={} ({:?})", key, delivery);
                }
                Err((e, _message)) => {
                    // Logged and dropped; there is no retry.
                    counter!("kafka_publish_failures_total").increment(1);
                    warn!("Publish failed for txhash={}: {}", key, e);
                }
            }
        });
        self.in_flight.push(handle);
        gauge!("kafka_in_flight").set(self.in_flight.len() as f64);

        Ok(())
    }
}

#[async_trait]
impl BatchSink for KafkaSink {
    fn name(&self) -> &'static str {
        "kafka"
    }

    async fn deliver(&mut self, events: Vec<AcceptEvent>) -> Result<()> {
        for event in &events {
            self.publish(event).await?;
        }
        debug!("Queued {} messages to {}", events.len(), self.config.topic);
        Ok(())
    }

    async fn drain(&mut self) -> Result<()> {
        let outstanding = self.in_flight.len();
        if outstanding > 0 {
            info!("Waiting for {} in-flight publishes...", outstanding);
        }
        for handle in self.in_flight.drain(..) {
            handle.await?;
        }
        gauge!("kafka_in_flight").set(0.0);
        Ok(())
    }
}
