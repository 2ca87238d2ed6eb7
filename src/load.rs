//! The CSV → Kafka load loop.
//!
//! One sequential pass: each row is read, transformed, and enqueued before
//! the next one is read. The publisher is always closed (flush, then
//! release), also when the loop fails part-way.

use crate::config::LoadConfig;
use crate::metrics::{append_entry, MetricsEntry};
use crate::source::CsvSource;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use transaction_types::{transform_row, transform_row_with_stats, CoercionStats};
use txn_loader_kafka_producer::{
    connect, MessageSink, PublishSummary, Publisher, PublisherError, TokioSleeper,
};

/// Outcome of a load.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub publish: PublishSummary,
    /// Present when `report_coercions` was enabled
    pub coercions: Option<CoercionStats>,
    pub elapsed: Duration,
}

impl LoadSummary {
    /// Records handed to the broker.
    pub fn sent(&self) -> u64 {
        self.publish.sent
    }
}

/// Validate the source, connect to Kafka, and load every row.
///
/// A missing source file fails before any broker interaction. An unreachable
/// broker fails after the retry policy is exhausted.
pub async fn run(config: &LoadConfig) -> Result<LoadSummary> {
    config.validate_source()?;

    info!(
        "pushing data from {} -> {} on {}",
        config.source.display(),
        config.topic,
        config.broker()
    );

    let sink = connect(&config.producer, &config.retry, &TokioSleeper).await?;

    if let Some(partitions) = config.create_topic {
        sink.create_topic_if_not_exists(&config.topic, partitions)
            .await
            .with_context(|| format!("Failed to create topic '{}'", config.topic))?;
    }

    let publisher = Publisher::new(sink, config.topic.as_str()).with_flush_every(config.flush_every);
    let summary = load_transactions(config, publisher).await?;

    if let Some(path) = &config.emit_metrics {
        append_entry(path, &MetricsEntry::from_summary(config, &summary)).await?;
    }

    Ok(summary)
}

/// Stream records from the configured CSV file through `publisher`.
///
/// The publisher is closed whether or not the loop succeeds. If both the loop
/// and the close fail, the loop's error is returned.
pub async fn load_transactions<S: MessageSink>(
    config: &LoadConfig,
    mut publisher: Publisher<S>,
) -> Result<LoadSummary> {
    let start = Instant::now();
    let mut coercions = config.report_coercions.then(CoercionStats::new);

    let outcome = publish_rows(config, &mut publisher, coercions.as_mut()).await;
    let closed = publisher.close().await;

    let publish = match (outcome, closed) {
        (Ok(()), Ok(summary)) => summary,
        (Ok(()), Err(e)) => {
            return Err(e).context("Failed to flush and close the Kafka producer");
        }
        (Err(e), Ok(summary)) => {
            warn!("Load stopped after {} records", summary.sent);
            return Err(e);
        }
        (Err(e), Err(close_err)) => {
            warn!("Failed to close the Kafka producer after an error: {close_err}");
            return Err(e);
        }
    };

    if let Some(stats) = &coercions {
        report_coercions(stats);
    }

    Ok(LoadSummary {
        publish,
        coercions,
        elapsed: start.elapsed(),
    })
}

async fn publish_rows<S: MessageSink>(
    config: &LoadConfig,
    publisher: &mut Publisher<S>,
    mut coercions: Option<&mut CoercionStats>,
) -> Result<()> {
    let mut source = CsvSource::open(&config.source, config.delimiter)?;

    for row in source.rows() {
        if config.max_records.is_some_and(|max| publisher.sent() >= max) {
            break;
        }
        let row = row?;

        let payload = match coercions.as_deref_mut() {
            Some(stats) => transform_row_with_stats(&row, &config.numeric_fields, stats),
            None => transform_row(&row, &config.numeric_fields),
        };

        let key = config
            .key_field
            .as_deref()
            .and_then(|field| row.get(field))
            .map(str::trim)
            .filter(|key| !key.is_empty());

        let record = publisher.sent() + 1;
        publisher.send(&payload, key).await.map_err(|e| match e {
            PublisherError::ProgressFlush { .. } => anyhow::Error::new(e),
            e => anyhow::Error::new(e).context(format!("Failed to publish record {record}")),
        })?;
    }

    Ok(())
}

fn report_coercions(stats: &CoercionStats) {
    info!(
        "{} numeric values were published as null across {} rows ({} blank, {} unparsable, {} missing)",
        stats.total_absent(),
        stats.rows,
        stats.blank,
        stats.unparsable,
        stats.missing
    );
    for (field, count) in &stats.per_field {
        info!("  {field}: {count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use txn_loader_kafka_producer::MemorySink;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{contents}").unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[tokio::test]
    async fn test_record_cap() {
        let file = csv_file("amount\n1\n2\n3\n4\n5\n");
        let config = LoadConfig {
            source: file.path().to_path_buf(),
            max_records: Some(2),
            ..Default::default()
        };
        let sink = MemorySink::new();
        let handle = sink.clone();

        let summary = load_transactions(&config, Publisher::new(sink, "t"))
            .await
            .unwrap();

        assert_eq!(summary.sent(), 2);
        assert_eq!(handle.delivered().len(), 2);
        assert!(summary.coercions.is_none());
    }

    #[tokio::test]
    async fn test_key_field_sets_message_key() {
        let file = csv_file("trans_num,amount\n abc123 ,1.5\n,2.5\n");
        let config = LoadConfig {
            source: file.path().to_path_buf(),
            key_field: Some("trans_num".to_string()),
            ..Default::default()
        };
        let sink = MemorySink::new();
        let handle = sink.clone();

        load_transactions(&config, Publisher::new(sink, "t"))
            .await
            .unwrap();

        let messages = handle.delivered();
        assert_eq!(messages[0].key.as_deref(), Some("abc123"));
        assert_eq!(messages[1].key, None);
    }

    #[tokio::test]
    async fn test_close_runs_when_source_cannot_be_opened() {
        let config = LoadConfig {
            source: "/nonexistent/train.csv".into(),
            ..Default::default()
        };
        let sink = MemorySink::new();
        let handle = sink.clone();

        let result = load_transactions(&config, Publisher::new(sink, "t")).await;

        assert!(result.is_err());
        assert!(handle.is_closed());
        assert_eq!(handle.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_progress_flush_failure_is_not_blamed_on_a_record() {
        let file = csv_file("amount\n1\n2\n3\n");
        let config = LoadConfig {
            source: file.path().to_path_buf(),
            ..Default::default()
        };
        let sink = MemorySink::failing_flush();
        let handle = sink.clone();

        let err = load_transactions(&config, Publisher::new(sink, "t").with_flush_every(2))
            .await
            .unwrap_err();

        let message = format!("{err:#}");
        assert!(
            message.starts_with("Progress flush after 2 records failed: Kafka error"),
            "{message}"
        );
        assert!(!message.contains("Failed to publish record"));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_enqueue_failure_names_the_record() {
        let file = csv_file("amount\n1\n2\n");
        let config = LoadConfig {
            source: file.path().to_path_buf(),
            ..Default::default()
        };
        let mut sink = MemorySink::new();
        sink.close().await.unwrap();

        let err = load_transactions(&config, Publisher::new(sink, "t"))
            .await
            .unwrap_err();

        assert_eq!(
            format!("{err:#}"),
            "Failed to publish record 1: Publisher is closed"
        );
    }

    #[tokio::test]
    async fn test_coercion_report() {
        let file = csv_file("amount,lat\nbad,40.1\n,x\n");
        let config = LoadConfig {
            source: file.path().to_path_buf(),
            report_coercions: true,
            ..Default::default()
        };

        let summary = load_transactions(&config, Publisher::new(MemorySink::new(), "t"))
            .await
            .unwrap();

        let stats = summary.coercions.unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.unparsable, 2);
        assert_eq!(stats.blank, 1);
    }
}
