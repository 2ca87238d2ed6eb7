//! Load configuration.

use std::path::{Path, PathBuf};
use transaction_types::NumericFieldSpec;
use txn_loader_kafka_producer::{ProducerConfig, RetryPolicy, DEFAULT_FLUSH_EVERY};

/// Configuration for one CSV → Kafka load
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// CSV file with a header row
    pub source: PathBuf,

    /// Kafka topic to produce into
    pub topic: String,

    /// Optional cap on records to send
    pub max_records: Option<u64>,

    /// Broker connection retry policy
    pub retry: RetryPolicy,

    /// Kafka producer settings, including the broker address
    pub producer: ProducerConfig,

    /// Number of messages between progress flushes
    pub flush_every: u64,

    /// CSV delimiter character (default: ',')
    pub delimiter: u8,

    /// Optional column whose value is used as the message key
    pub key_field: Option<String>,

    /// Columns parsed as numbers
    pub numeric_fields: NumericFieldSpec,

    /// Count numeric values that were dropped to null and log a summary
    pub report_coercions: bool,

    /// Create the topic with this many partitions before loading
    pub create_topic: Option<i32>,

    /// Optional path to append a JSON metrics line to after the load
    pub emit_metrics: Option<PathBuf>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("train.csv"),
            topic: "transactions_topic".to_string(),
            max_records: None,
            retry: RetryPolicy::default(),
            producer: ProducerConfig::default(),
            flush_every: DEFAULT_FLUSH_EVERY,
            delimiter: b',',
            key_field: None,
            numeric_fields: NumericFieldSpec::transactions(),
            report_coercions: false,
            create_topic: None,
            emit_metrics: None,
        }
    }
}

impl LoadConfig {
    /// Broker address the load connects to.
    pub fn broker(&self) -> &str {
        &self.producer.brokers
    }

    /// Fail unless the source path points at an existing file.
    pub fn validate_source(&self) -> anyhow::Result<()> {
        if !self.source.is_file() {
            anyhow::bail!("{} is not a readable file", self.source.display());
        }
        Ok(())
    }
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parse a single-byte CSV delimiter. Accepts `\t` and `tab` for tabs.
pub fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!("delimiter must be a single ASCII character, got `{s}`")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = LoadConfig::default();
        assert_eq!(config.source, PathBuf::from("train.csv"));
        assert_eq!(config.broker(), "localhost:9092");
        assert_eq!(config.topic, "transactions_topic");
        assert_eq!(config.max_records, None);
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.wait.as_secs_f64(), 3.0);
        assert_eq!(config.flush_every, 250);
        assert_eq!(config.delimiter, b',');
        assert!(!config.report_coercions);
    }

    #[test]
    fn test_validate_source() {
        let file = NamedTempFile::new().unwrap();
        let config = LoadConfig {
            source: file.path().to_path_buf(),
            ..Default::default()
        };
        assert!(config.validate_source().is_ok());

        let missing = LoadConfig {
            source: PathBuf::from("/nonexistent/train.csv"),
            ..Default::default()
        };
        let err = missing.validate_source().unwrap_err();
        assert_eq!(
            err.to_string(),
            "/nonexistent/train.csv is not a readable file"
        );
    }

    #[test]
    fn test_directory_is_not_a_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoadConfig {
            source: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(config.validate_source().is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(
            expand_home(Path::new("data/train.csv")),
            PathBuf::from("data/train.csv")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/train.csv")), home.join("train.csv"));
        }
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("linger.ms=5").unwrap(),
            ("linger.ms".to_string(), "5".to_string())
        );
        assert_eq!(
            parse_key_val("sasl.password=a=b").unwrap(),
            ("sasl.password".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("linger.ms").is_err());
        assert!(parse_key_val("=5").is_err());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(parse_delimiter(",,").is_err());
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("é").is_err());
    }
}
