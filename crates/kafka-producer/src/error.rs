//! Error types for the Kafka publisher.

use thiserror::Error;

/// Errors that can occur while connecting to Kafka or publishing records.
#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Kafka broker {broker} unreachable after {attempts} attempts: {last_error}")]
    BrokerUnreachable {
        broker: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Payload encoding error: {0}")]
    Encode(#[from] transaction_types::TransactionTypesError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Topic creation error: {0}")]
    TopicCreation(String),

    #[error("Progress flush after {sent} records failed")]
    ProgressFlush {
        sent: u64,
        #[source]
        source: Box<PublisherError>,
    },

    #[error("Publisher is closed")]
    Closed,

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for publisher operations.
pub type Result<T> = std::result::Result<T, PublisherError>;
