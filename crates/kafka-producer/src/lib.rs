//! Kafka publisher for txn-loader
//!
//! This library owns the broker side of a load: connecting with bounded
//! retry, enqueueing JSON payloads, flushing on a fixed cadence, and the
//! final flush-then-close.
//!
//! ## Features
//!
//! - **Bounded retry**: [`retry_with_policy`] with an injectable [`Sleeper`]
//! - **Kafka connection**: [`connect`] returns a [`KafkaSink`] backed by rdkafka
//! - **Flush cadence**: [`Publisher`] flushes every N messages and on close
//! - **Topic management**: [`KafkaSink::create_topic_if_not_exists`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use txn_loader_kafka_producer::{connect, ProducerConfig, Publisher, RetryPolicy, TokioSleeper};
//! use transaction_types::{transform_row, NumericFieldSpec, Row};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProducerConfig::new("localhost:9092");
//!     let sink = connect(&config, &RetryPolicy::default(), &TokioSleeper).await?;
//!     let mut publisher = Publisher::new(sink, "transactions_topic");
//!
//!     let mut row = Row::new();
//!     row.push("amount", Some("12.50"));
//!     publisher
//!         .send(&transform_row(&row, &NumericFieldSpec::transactions()), None)
//!         .await?;
//!
//!     let summary = publisher.close().await?;
//!     println!("sent {}", summary.sent);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod producer;
pub mod publisher;
pub mod retry;
pub mod sink;

pub use error::{PublisherError, Result};
pub use producer::{connect, KafkaSink, ProducerConfig};
pub use publisher::{PublishSummary, Publisher, DEFAULT_FLUSH_EVERY};
pub use retry::{
    retry_with_policy, RetryExhausted, RetryPolicy, Sleeper, TokioSleeper, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RETRY_WAIT,
};
pub use sink::{CapturedMessage, FlushReport, MemorySink, MessageSink};
