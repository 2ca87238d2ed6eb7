//! The seam between the publisher and a broker connection.

use crate::error::{PublisherError, Result};
use async_trait::async_trait;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::sync::{Arc, Mutex, MutexGuard};

/// Delivery outcome of the messages resolved by a flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: u64,
    pub failed: u64,
}

impl FlushReport {
    pub fn merge(&mut self, other: FlushReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

/// A buffered connection to a message broker.
///
/// Messages are delivered in enqueue order per connection; delivery is only
/// guaranteed once [`flush`](MessageSink::flush) returns.
#[async_trait]
pub trait MessageSink: Send {
    /// Enqueue a message for `topic` without waiting for acknowledgement.
    ///
    /// Waits for room when the local send buffer is full.
    async fn enqueue(&mut self, topic: &str, key: Option<&str>, payload: &[u8]) -> Result<()>;

    /// Force delivery of everything enqueued so far.
    async fn flush(&mut self) -> Result<FlushReport>;

    /// Flush pending messages and release the connection.
    ///
    /// The connection is released even when the final flush fails. After
    /// closing, `enqueue` and `flush` fail with [`PublisherError::Closed`].
    async fn close(&mut self) -> Result<FlushReport>;
}

/// A message captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct MemoryState {
    pending: Vec<CapturedMessage>,
    delivered: Vec<CapturedMessage>,
    flushes: usize,
    closed: bool,
    fail_flushes: bool,
}

/// In-process sink that records messages instead of sending them.
///
/// Clones share the same state, so a test can keep a handle while the
/// publisher owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose flushes always time out. Enqueued messages stay pending.
    pub fn failing_flush() -> Self {
        let sink = Self::default();
        sink.state().fail_flushes = true;
        sink
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another holder panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Messages that have been flushed.
    pub fn delivered(&self) -> Vec<CapturedMessage> {
        self.state().delivered.clone()
    }

    /// Messages enqueued but not flushed yet.
    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    /// Number of flushes, including the one performed by `close`.
    pub fn flush_count(&self) -> usize {
        self.state().flushes
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn enqueue(&mut self, topic: &str, key: Option<&str>, payload: &[u8]) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(PublisherError::Closed);
        }
        state.pending.push(CapturedMessage {
            topic: topic.to_string(),
            key: key.map(str::to_string),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn flush(&mut self) -> Result<FlushReport> {
        let mut state = self.state();
        if state.closed {
            return Err(PublisherError::Closed);
        }
        state.flushes += 1;
        if state.fail_flushes {
            return Err(KafkaError::Flush(RDKafkaErrorCode::RequestTimedOut).into());
        }
        let pending = std::mem::take(&mut state.pending);
        let report = FlushReport {
            delivered: pending.len() as u64,
            failed: 0,
        };
        state.delivered.extend(pending);
        Ok(report)
    }

    async fn close(&mut self) -> Result<FlushReport> {
        let result = self.flush().await;
        self.state().closed = true;
        result
    }
}
