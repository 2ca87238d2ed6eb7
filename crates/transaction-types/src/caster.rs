//! Numeric casters and the numeric field table.

use crate::error::{Result, TransactionTypesError};
use crate::payload::FieldValue;
use crate::transform::AbsentReason;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Parser applied to a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Caster {
    /// 64-bit floating point. Non-finite results are rejected.
    Float,
    /// 64-bit signed integer in plain decimal notation. Digit separators
    /// such as `1_000` are not accepted.
    Integer,
}

impl Caster {
    /// Cast an already trimmed, non-empty value.
    ///
    /// Returns `None` when the text is not a valid representation of the
    /// caster's type.
    pub fn cast(self, trimmed: &str) -> Option<FieldValue> {
        match self {
            Caster::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(FieldValue::Float),
            Caster::Integer => trimmed.parse::<i64>().ok().map(FieldValue::Integer),
        }
    }
}

impl fmt::Display for Caster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caster::Float => write!(f, "float"),
            Caster::Integer => write!(f, "integer"),
        }
    }
}

impl FromStr for Caster {
    type Err = TransactionTypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float" | "f64" => Ok(Caster::Float),
            "int" | "integer" | "i64" => Ok(Caster::Integer),
            other => Err(TransactionTypesError::UnknownCaster(other.to_string())),
        }
    }
}

/// Coerce a raw CSV value through `caster`, reporting why it became absent.
pub(crate) fn coerce(
    raw: Option<&str>,
    caster: Caster,
) -> std::result::Result<FieldValue, AbsentReason> {
    let raw = raw.ok_or(AbsentReason::Missing)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AbsentReason::Blank);
    }
    caster.cast(trimmed).ok_or(AbsentReason::Unparsable)
}

/// Convert a CSV field to the caster's numeric type when possible.
///
/// Missing, blank and unparsable input all map to [`FieldValue::Absent`].
pub fn parse_value(raw: Option<&str>, caster: Caster) -> FieldValue {
    coerce(raw, caster).unwrap_or(FieldValue::Absent)
}

/// Table mapping field names to the caster used for that column.
///
/// Columns not present in the table are treated as text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NumericFieldSpec {
    casters: HashMap<String, Caster>,
}

impl NumericFieldSpec {
    /// Create an empty table (every column is text).
    pub fn new() -> Self {
        Self::default()
    }

    /// The numeric columns of the transactions dataset.
    pub fn transactions() -> Self {
        Self::new()
            .with_field("amount", Caster::Float)
            .with_field("lat", Caster::Float)
            .with_field("lon", Caster::Float)
            .with_field("merchant_lat", Caster::Float)
            .with_field("merchant_lon", Caster::Float)
            .with_field("population_city", Caster::Integer)
            .with_field("target", Caster::Integer)
    }

    /// Add or replace the caster for a field.
    pub fn with_field(mut self, name: impl Into<String>, caster: Caster) -> Self {
        self.casters.insert(name.into(), caster);
        self
    }

    /// Parse a `NAME=CASTER` definition, e.g. `"fee=float"`.
    pub fn parse_definition(definition: &str) -> Result<(String, Caster)> {
        let (name, caster) = definition
            .split_once('=')
            .ok_or_else(|| TransactionTypesError::InvalidFieldDefinition(definition.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(TransactionTypesError::InvalidFieldDefinition(
                definition.to_string(),
            ));
        }
        Ok((name.to_string(), caster.parse()?))
    }

    /// Caster registered for `field`, if it is numeric.
    pub fn caster_for(&self, field: &str) -> Option<Caster> {
        self.casters.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.casters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.casters.is_empty()
    }
}
