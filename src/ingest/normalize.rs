//! Timestamp normalization applied to every batch before it is appended.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{IngestError, Result};
use crate::formats::{Batch, Value};

/// Text layouts accepted for timestamp columns, tried in order
const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f", // 2021-01-01 00:15:56(.123)
    "%Y-%m-%dT%H:%M:%S%.f", // 2021-01-01T00:15:56(.123)
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p", // 01/01/2021 12:15:56 AM
];

/// Parse a timestamp from its text representation
///
/// Values with a UTC offset are converted to UTC; bare dates map to midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.naive_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// A batch whose timestamp columns hold parsed timestamps (or nulls)
///
/// Only [`normalize_timestamps`] constructs one, so anything that accepts a
/// `NormalizedBatch` can rely on those columns never holding raw strings.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    batch: Batch,
}

impl NormalizedBatch {
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}

/// Parse every value of `columns` into a timestamp
///
/// `first_row` is the file row index of the batch's first record and is
/// added to the row reported by `TimestampParse`. Fails on the first value
/// that cannot be parsed; no rows are skipped.
pub fn normalize_timestamps<S: AsRef<str>>(
    mut batch: Batch,
    columns: &[S],
    first_row: usize,
) -> Result<NormalizedBatch> {
    for column in columns {
        let column = column.as_ref();
        let idx = batch
            .column_index(column)
            .ok_or_else(|| IngestError::MissingColumn {
                column: column.to_string(),
            })?;

        for (offset, record) in batch.records.iter_mut().enumerate() {
            let Some(cell) = record.fields.get_mut(idx) else {
                continue;
            };

            let parsed = match cell {
                Value::Null | Value::Timestamp(_) => continue,
                Value::Text(text) => parse_timestamp(text),
                Value::Bool(_) | Value::Int(_) | Value::Float(_) => None,
            };

            match parsed {
                Some(ts) => *cell = Value::Timestamp(ts),
                None => {
                    return Err(IngestError::TimestampParse {
                        column: column.to_string(),
                        row: first_row + offset,
                        value: cell.render().unwrap_or_default(),
                    });
                }
            }
        }
    }

    Ok(NormalizedBatch { batch })
}
