//! txn-loader: publish transaction CSV records to Kafka.
//!
//! The crate wires the pieces of a load together:
//!
//! - [`config`] - Load configuration and CLI value parsers
//! - [`source`] - Header-keyed CSV row reader
//! - [`load`] - Connect, read, transform, publish, and close
//! - [`metrics`] - Optional JSON summary line per load
//!
//! Row conversion lives in the `transaction-types` crate and the Kafka side
//! in `txn-loader-kafka-producer`.

pub mod config;
pub mod load;
pub mod metrics;
pub mod source;

pub use config::LoadConfig;
pub use load::{load_transactions, run, LoadSummary};
pub use source::CsvSource;
