//! Row → Payload conversion.

use crate::caster::{coerce, NumericFieldSpec};
use crate::payload::{FieldValue, Payload};
use std::collections::BTreeMap;

/// One CSV record keyed by header name.
///
/// A value is `None` when the record has fewer columns than the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    fields: Vec<(String, Option<String>)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `headers` with `values`. Missing trailing values become `None`,
    /// surplus values are dropped.
    pub fn from_record<H, V>(headers: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                (
                    header.as_ref().to_string(),
                    values.get(i).map(|v| v.as_ref().to_string()),
                )
            })
            .collect();
        Self { fields }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<&str>) {
        self.fields.push((name.into(), value.map(str::to_string)));
    }

    /// Raw value of the first column named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }
}

/// Why a numeric field ended up absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbsentReason {
    /// The record had no value for the column.
    Missing,
    /// The value was empty after trimming.
    Blank,
    /// The value did not parse as the column's type.
    Unparsable,
}

/// Counters of numeric fields that were coerced to absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionStats {
    pub rows: u64,
    pub missing: u64,
    pub blank: u64,
    pub unparsable: u64,
    /// Absent count per field name, all reasons combined.
    pub per_field: BTreeMap<String, u64>,
}

impl CoercionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total numeric values that became absent.
    pub fn total_absent(&self) -> u64 {
        self.missing + self.blank + self.unparsable
    }

    fn record(&mut self, field: &str, reason: AbsentReason) {
        match reason {
            AbsentReason::Missing => self.missing += 1,
            AbsentReason::Blank => self.blank += 1,
            AbsentReason::Unparsable => self.unparsable += 1,
        }
        *self.per_field.entry(field.to_string()).or_insert(0) += 1;
    }
}

/// Transform a CSV row into the payload that is published.
///
/// Columns listed in `spec` are parsed through their caster; blank or
/// unparsable values become [`FieldValue::Absent`]. Other columns become the
/// trimmed string, or absent when the record had no value.
pub fn transform_row(row: &Row, spec: &NumericFieldSpec) -> Payload {
    convert(row, spec, |_, _| {})
}

/// Same as [`transform_row`], additionally counting absent numeric values.
pub fn transform_row_with_stats(
    row: &Row,
    spec: &NumericFieldSpec,
    stats: &mut CoercionStats,
) -> Payload {
    stats.rows += 1;
    convert(row, spec, |field, reason| stats.record(field, reason))
}

fn convert<F>(row: &Row, spec: &NumericFieldSpec, mut on_absent: F) -> Payload
where
    F: FnMut(&str, AbsentReason),
{
    let mut payload = Payload::with_capacity(row.len());
    for (key, value) in row.iter() {
        let field = match spec.caster_for(key) {
            Some(caster) => coerce(value, caster).unwrap_or_else(|reason| {
                on_absent(key, reason);
                FieldValue::Absent
            }),
            None => value
                .map(|v| FieldValue::text(v.trim()))
                .unwrap_or(FieldValue::Absent),
        };
        payload.insert(key, field);
    }
    payload
}
