//! CSV source reading rows keyed by the header line.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use tracing::debug;
use transaction_types::Row;

/// Streams records from a CSV file with a header row.
///
/// Records shorter than the header yield missing values; surplus values are
/// ignored. Blank lines are skipped.
pub struct CsvSource {
    reader: csv::Reader<File>,
    headers: Vec<String>,
}

impl CsvSource {
    pub fn open(path: &Path, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let headers = reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<String>>();

        debug!("Opened {} with columns: {}", path.display(), headers.join(", "));

        Ok(Self { reader, headers })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Iterate over the remaining records.
    pub fn rows(&mut self) -> impl Iterator<Item = Result<Row>> + '_ {
        let headers = &self.headers;
        self.reader
            .records()
            .enumerate()
            .map(move |(index, record)| {
                let record = record
                    .with_context(|| format!("Failed to read CSV record {}", index + 1))?;
                let values: Vec<&str> = record.iter().collect();
                if values.len() > headers.len() {
                    debug!(
                        "CSV record {} has {} values for {} columns; ignoring the extra values",
                        index + 1,
                        values.len(),
                        headers.len()
                    );
                }
                Ok(Row::from_record(headers.as_slice(), values.as_slice()))
            })
    }
}
