//! Kafka connection backed by an rdkafka `FutureProducer`.

use crate::error::{PublisherError, Result};
use crate::retry::{retry_with_policy, RetryPolicy, Sleeper};
use crate::sink::{FlushReport, MessageSink};
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{DeliveryFuture, FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Kafka producer settings
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Time librdkafka keeps trying to deliver a message
    pub message_timeout_ms: u64,
    /// Timeout of the metadata request used to check the broker is reachable
    pub probe_timeout: Duration,
    /// Upper bound on a single flush
    pub flush_timeout: Duration,
    /// How long a send waits for room when the local queue is full
    pub queue_timeout: Duration,
    /// Extra librdkafka properties, applied after the defaults
    pub properties: Vec<(String, String)>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            message_timeout_ms: 30000,
            probe_timeout: Duration::from_secs(5),
            flush_timeout: Duration::from_secs(60),
            queue_timeout: Duration::from_secs(30),
            properties: Vec::new(),
        }
    }
}

impl ProducerConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            ..Default::default()
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("message.timeout.ms", self.message_timeout_ms.to_string());
        for (key, value) in &self.properties {
            config.set(key, value);
        }
        config
    }
}

/// Connect to Kafka, retrying while the broker is unreachable.
///
/// The producer is created once; an invalid configuration fails immediately.
/// Reachability is checked with a metadata request, which is retried
/// according to `policy`.
pub async fn connect(
    config: &ProducerConfig,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<KafkaSink> {
    let sink = KafkaSink::new(config)?;

    debug!("Connecting to Kafka at {}", config.brokers);

    retry_with_policy(policy, sleeper, &config.brokers, |_| {
        probe(sink.producer.clone(), config.probe_timeout)
    })
    .await
    .map_err(|exhausted| PublisherError::BrokerUnreachable {
        broker: config.brokers.clone(),
        attempts: exhausted.attempts,
        last_error: exhausted
            .last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no connection attempts were made".to_string()),
    })?;

    info!("Connected to Kafka broker {}", config.brokers);

    Ok(sink)
}

async fn probe(producer: Option<FutureProducer>, timeout: Duration) -> Result<()> {
    let producer = producer.ok_or(PublisherError::Closed)?;
    let broker_count = tokio::task::spawn_blocking(move || {
        producer
            .client()
            .fetch_metadata(None, timeout)
            .map(|metadata| metadata.brokers().len())
    })
    .await??;

    debug!("Broker metadata lists {broker_count} brokers");
    Ok(())
}

/// An open Kafka connection.
///
/// Sends are fire-and-forget; their delivery futures are resolved on flush.
pub struct KafkaSink {
    producer: Option<FutureProducer>,
    pending: Vec<DeliveryFuture>,
    brokers: String,
    flush_timeout: Duration,
    queue_timeout: Duration,
}

/// Pause between sends while librdkafka's queue is full.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(50);

impl KafkaSink {
    /// Create the producer without checking that the broker is reachable.
    ///
    /// Use [`connect`] to wait for the broker.
    pub fn new(config: &ProducerConfig) -> Result<Self> {
        let producer: FutureProducer = config.client_config().create()?;
        Ok(Self {
            producer: Some(producer),
            pending: Vec::new(),
            brokers: config.brokers.clone(),
            flush_timeout: config.flush_timeout,
            queue_timeout: config.queue_timeout,
        })
    }

    /// Create Kafka topic if it doesn't exist
    pub async fn create_topic_if_not_exists(&self, topic: &str, partitions: i32) -> Result<()> {
        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()?;

        let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(1));
        let opts = AdminOptions::new().operation_timeout(Some(Duration::from_secs(10)));

        let results = admin_client
            .create_topics(&[new_topic], &opts)
            .await
            .map_err(|e| PublisherError::TopicCreation(format!("Failed to create topic: {e}")))?;

        for result in results {
            match result {
                Ok(topic_name) => info!("Topic '{topic_name}' created successfully"),
                Err((topic_name, err)) => {
                    let err_str = err.to_string();
                    if err_str.contains("already exists") || err_str.contains("TopicExistsException")
                    {
                        info!("Topic '{topic_name}' already exists");
                    } else {
                        return Err(PublisherError::TopicCreation(format!(
                            "Failed to create topic {topic_name}: {err}"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl MessageSink for KafkaSink {
    async fn enqueue(&mut self, topic: &str, key: Option<&str>, payload: &[u8]) -> Result<()> {
        let producer = self.producer.as_ref().ok_or(PublisherError::Closed)?;
        let deadline = Instant::now() + self.queue_timeout;
        let mut waited = false;

        let delivery = loop {
            let mut record: FutureRecord<'_, str, [u8]> = FutureRecord::to(topic).payload(payload);
            if let Some(key) = key {
                record = record.key(key);
            }

            match producer.send_result(record) {
                Ok(delivery) => break delivery,
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _))
                    if Instant::now() < deadline =>
                {
                    if !waited {
                        debug!("Producer queue is full, waiting for room");
                        waited = true;
                    }
                }
                Err((err, _)) => return Err(err.into()),
            }
            tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
        };

        self.pending.push(delivery);
        Ok(())
    }

    async fn flush(&mut self) -> Result<FlushReport> {
        let producer = self.producer.clone().ok_or(PublisherError::Closed)?;
        let timeout = self.flush_timeout;
        tokio::task::spawn_blocking(move || producer.flush(timeout)).await??;

        let mut report = FlushReport::default();
        for delivery in std::mem::take(&mut self.pending) {
            match delivery.await {
                Ok(Ok(_)) => report.delivered += 1,
                Ok(Err((err, _))) => {
                    report.failed += 1;
                    debug!("Message delivery failed: {err}");
                }
                Err(_) => {
                    report.failed += 1;
                    debug!("Message delivery was cancelled");
                }
            }
        }

        if report.failed > 0 {
            warn!(
                "{} of {} messages were not delivered to {}",
                report.failed,
                report.delivered + report.failed,
                self.brokers
            );
        }

        Ok(report)
    }

    async fn close(&mut self) -> Result<FlushReport> {
        let result = self.flush().await;
        if self.producer.take().is_some() {
            debug!("Released Kafka producer for {}", self.brokers);
        }
        result
    }
}
