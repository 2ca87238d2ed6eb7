//! Error types for transaction-types crate.

use thiserror::Error;

/// Errors that can occur while configuring or encoding transaction payloads.
///
/// Field coercion itself never fails; malformed values become
/// [`FieldValue::Absent`](crate::FieldValue::Absent).
#[derive(Error, Debug)]
pub enum TransactionTypesError {
    #[error("JSON encoding error: {0}")]
    JsonEncode(#[from] serde_json::Error),

    #[error("Unknown caster '{0}' (expected 'float', 'int' or 'integer')")]
    UnknownCaster(String),

    #[error("Invalid numeric field definition '{0}' (expected NAME=CASTER)")]
    InvalidFieldDefinition(String),
}

/// Result type alias for transaction-types operations.
pub type Result<T> = std::result::Result<T, TransactionTypesError>;
