//! Transaction record conversion for txn-loader.
//!
//! This crate turns raw CSV rows into the JSON payloads published to Kafka.
//! A fixed table of numeric fields decides which columns are parsed as
//! numbers; every other column passes through as a trimmed string.
//!
//! # Architecture
//!
//! ```text
//! Row (column → raw string) ──transform_row(spec)──▶ Payload (column → FieldValue) ──▶ JSON bytes
//! ```
//!
//! # Modules
//!
//! - [`caster`] - Numeric casters and the numeric field table
//! - [`payload`] - Typed field values and the JSON payload
//! - [`transform`] - Row → Payload conversion and coercion statistics
//! - [`error`] - Error types for this crate
//!
//! # Example
//!
//! ```
//! use transaction_types::{transform_row, FieldValue, NumericFieldSpec, Row};
//!
//! let mut row = Row::new();
//! row.push("amount", Some(" 12.50 "));
//! row.push("merchant", Some("ShopA"));
//!
//! let payload = transform_row(&row, &NumericFieldSpec::transactions());
//! assert_eq!(payload.get("amount"), Some(&FieldValue::Float(12.5)));
//! assert_eq!(payload.get("merchant"), Some(&FieldValue::text("ShopA")));
//! ```

pub mod caster;
pub mod error;
pub mod payload;
pub mod transform;

pub use caster::{parse_value, Caster, NumericFieldSpec};
pub use error::{Result, TransactionTypesError};
pub use payload::{FieldValue, Payload};
pub use transform::{transform_row, transform_row_with_stats, AbsentReason, CoercionStats, Row};
