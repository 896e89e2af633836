// src/validate.rs
use serde_json::Value;

use crate::errors::ValidationError;
use crate::record::{Record, METRICS};

/// Reject a record that cannot go into a snapshot.
///
/// `cases` must be present, no present field may be an explicit null, and
/// every present numeric field must be a real number.
pub fn validate(record: &Record) -> Result<(), ValidationError> {
    if record.cases.is_none() {
        return Err(ValidationError::MissingCases);
    }

    for name in METRICS {
        if let Some(v) = record.metric(name) {
            if !v.is_finite() {
                return Err(ValidationError::NotANumber(s!(name)));
            }
        }
    }
    if let Some(c) = record.coordinates {
        if !c.iter().all(|v| v.is_finite()) {
            return Err(ValidationError::NotANumber(s!("coordinates")));
        }
    }

    if let Some(name) = record.non_finite.first() {
        return Err(ValidationError::NotANumber(name.clone()));
    }

    for (name, value) in &record.extra {
        if value.is_null() {
            return Err(ValidationError::NullField(name.clone()));
        }
        if let Value::Array(items) = value {
            if items.iter().any(Value::is_null) {
                return Err(ValidationError::NullField(name.clone()));
            }
        }
    }
    Ok(())
}

/// Validate every row; the first failure fails the lot.
pub fn validate_all(records: &[Record]) -> Result<(), ValidationError> {
    records.iter().try_for_each(validate)
}
