//! Publishing payloads to a topic with periodic flushing.

use crate::error::{PublisherError, Result};
use crate::sink::{FlushReport, MessageSink};
use tracing::info;
use transaction_types::Payload;

/// Default number of messages between progress flushes.
pub const DEFAULT_FLUSH_EVERY: u64 = 250;

/// Totals reported by a [`Publisher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// Messages handed to the sink.
    pub sent: u64,
    /// Flushes triggered by the flush cadence (the final flush is not counted).
    pub progress_flushes: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Sends JSON payloads to one topic over an owned sink.
///
/// Every `flush_every` messages the sink is flushed and progress is logged.
/// [`close`](Publisher::close) performs the final flush and releases the
/// sink.
pub struct Publisher<S: MessageSink> {
    sink: S,
    topic: String,
    flush_every: u64,
    sent: u64,
    progress_flushes: u64,
    deliveries: FlushReport,
}

impl<S: MessageSink> Publisher<S> {
    pub fn new(sink: S, topic: impl Into<String>) -> Self {
        Self {
            sink,
            topic: topic.into(),
            flush_every: DEFAULT_FLUSH_EVERY,
            sent: 0,
            progress_flushes: 0,
            deliveries: FlushReport::default(),
        }
    }

    /// Set the flush cadence. Zero is treated as one.
    pub fn with_flush_every(mut self, flush_every: u64) -> Self {
        self.flush_every = flush_every.max(1);
        self
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Encode `payload` and enqueue it without waiting for acknowledgement.
    ///
    /// A failed progress flush is reported as [`PublisherError::ProgressFlush`];
    /// the message itself was already enqueued and counted.
    pub async fn send(&mut self, payload: &Payload, key: Option<&str>) -> Result<()> {
        let bytes = payload.to_json_bytes()?;
        self.sink.enqueue(&self.topic, key, &bytes).await?;
        self.sent += 1;

        if self.sent % self.flush_every == 0 {
            let sent = self.sent;
            let report = self
                .sink
                .flush()
                .await
                .map_err(|e| PublisherError::ProgressFlush {
                    sent,
                    source: Box::new(e),
                })?;
            self.deliveries.merge(report);
            self.progress_flushes += 1;
            info!("sent {} records so far", self.sent);
        }

        Ok(())
    }

    pub fn summary(&self) -> PublishSummary {
        PublishSummary {
            sent: self.sent,
            progress_flushes: self.progress_flushes,
            delivered: self.deliveries.delivered,
            failed: self.deliveries.failed,
        }
    }

    /// Flush everything still pending and release the connection.
    pub async fn close(mut self) -> Result<PublishSummary> {
        let report = self.sink.close().await?;
        self.deliveries.merge(report);
        Ok(self.summary())
    }
}
