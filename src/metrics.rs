//! Metrics summary for a completed load

use crate::config::LoadConfig;
use crate::load::LoadSummary;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Single metrics entry (one JSON line)
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsEntry {
    pub timestamp: String,
    pub source: String,
    pub topic: String,
    pub records_sent: u64,
    pub delivered: u64,
    pub failed: u64,
    pub progress_flushes: u64,
    /// Present when coercion counting was enabled
    pub absent_numeric_values: Option<u64>,
    pub elapsed_secs: f64,
    pub throughput_records_per_sec: f64,
}

impl MetricsEntry {
    pub fn from_summary(config: &LoadConfig, summary: &LoadSummary) -> Self {
        let elapsed = summary.elapsed.as_secs_f64();
        let throughput = if elapsed > 0.0 {
            summary.publish.sent as f64 / elapsed
        } else {
            0.0
        };

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            source: config.source.display().to_string(),
            topic: config.topic.clone(),
            records_sent: summary.publish.sent,
            delivered: summary.publish.delivered,
            failed: summary.publish.failed,
            progress_flushes: summary.publish.progress_flushes,
            absent_numeric_values: summary.coercions.as_ref().map(|c| c.total_absent()),
            elapsed_secs: elapsed,
            throughput_records_per_sec: throughput,
        }
    }
}

/// Append `entry` as one JSON line to `path`, creating the file if needed.
pub async fn append_entry(path: &Path, entry: &MetricsEntry) -> Result<()> {
    let mut line = serde_json::to_string(entry).context("Failed to serialize metrics")?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open metrics file: {}", path.display()))?;
    file.write_all(line.as_bytes())
        .await
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    file.flush().await?;
    Ok(())
}
