//! Command-line interface for txn-loader
//!
//! # Usage Examples
//!
//! ```bash
//! # Publish train.csv to transactions_topic on localhost:9092
//! txn-loader
//!
//! # Smoke test against a broker that is still starting up
//! txn-loader data/train.csv \
//!   --broker kafka:29092 \
//!   --topic transactions_topic \
//!   --max-records 100 \
//!   --retries 20 --retry-wait 1.5
//!
//! # Key messages by transaction number and report dropped numeric values
//! txn-loader train.csv --key-field trans_num --report-coercions
//! ```

use clap::Parser;
use std::path::PathBuf;
use transaction_types::{Caster, NumericFieldSpec};
use txn_loader::config::{expand_home, parse_delimiter, parse_key_val};
use txn_loader::LoadConfig;
use txn_loader_kafka_producer::{ProducerConfig, RetryPolicy};

#[derive(Parser)]
#[command(name = "txn-loader")]
#[command(about = "Publish transactions CSV rows to Kafka")]
#[command(long_about = None)]
struct Cli {
    /// CSV file with transaction records
    #[arg(default_value = "train.csv")]
    source: PathBuf,

    /// Address of the Kafka broker
    #[arg(long, short = 'b', env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    broker: String,

    /// Kafka topic to produce into
    #[arg(long, short = 't', env = "KAFKA_TOPIC", default_value = "transactions_topic")]
    topic: String,

    /// Optional cap on records to send (useful for initial smoke tests)
    #[arg(long, short = 'm', value_parser = clap::value_parser!(u64).range(1..))]
    max_records: Option<u64>,

    /// Number of times to try connecting to Kafka before giving up
    #[arg(long, default_value = "10")]
    retries: u32,

    /// Seconds to wait between connection retries
    #[arg(long, default_value = "3.0")]
    retry_wait: f64,

    /// Number of records between progress flushes
    #[arg(long, default_value = "250", value_parser = clap::value_parser!(u64).range(1..))]
    flush_every: u64,

    /// CSV delimiter character (use "\t" or "tab" for tabs)
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Column whose value is used as the Kafka message key
    #[arg(long)]
    key_field: Option<String>,

    /// Additional or overriding numeric column (format: NAME=float|int)
    #[arg(long = "numeric-field", value_name = "NAME=CASTER", value_parser = parse_numeric_field)]
    numeric_fields: Vec<(String, Caster)>,

    /// Extra librdkafka producer property (format: KEY=VALUE)
    #[arg(long = "producer-property", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    producer_properties: Vec<(String, String)>,

    /// Create the topic before loading if it does not exist
    #[arg(long)]
    create_topic: bool,

    /// Partition count used with --create-topic
    #[arg(long, default_value = "3", requires = "create_topic")]
    partitions: i32,

    /// Log how many numeric values were published as null
    #[arg(long)]
    report_coercions: bool,

    /// Append a JSON metrics line to this file after the load
    #[arg(long)]
    emit_metrics: Option<PathBuf>,
}

fn parse_numeric_field(s: &str) -> Result<(String, Caster), String> {
    NumericFieldSpec::parse_definition(s).map_err(|e| e.to_string())
}

impl Cli {
    fn into_config(self) -> anyhow::Result<LoadConfig> {
        let retry = RetryPolicy::from_secs_f64(self.retries, self.retry_wait)?;

        let numeric_fields = self
            .numeric_fields
            .into_iter()
            .fold(NumericFieldSpec::transactions(), |spec, (name, caster)| {
                spec.with_field(name, caster)
            });

        let producer = ProducerConfig {
            properties: self.producer_properties,
            ..ProducerConfig::new(self.broker)
        };

        Ok(LoadConfig {
            source: expand_home(&self.source),
            topic: self.topic,
            max_records: self.max_records,
            retry,
            producer,
            flush_every: self.flush_every,
            delimiter: self.delimiter,
            key_field: self.key_field,
            numeric_fields,
            report_coercions: self.report_coercions,
            create_topic: self.create_topic.then_some(self.partitions),
            emit_metrics: self.emit_metrics,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_config()?;

    let summary = txn_loader::run(&config).await?;
    println!("finished sending {} records", summary.sent());

    Ok(())
}
