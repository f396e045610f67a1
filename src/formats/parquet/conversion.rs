//! Conversion from Arrow RecordBatch to row-based Records.
//!
//! Booleans, integers, floats, decimals and timestamps keep a typed `Value`
//! so the target column type follows the file schema. Strings, binary and
//! dates are rendered as text. Nulls become `Value::Null`.

use anyhow::{Context, Result};
use arrow::array::*;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Float16Type, Float32Type, Float64Type,
    Int8Type, Int16Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type,
    UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate};

use crate::formats::reader::{Record, Value};

/// Transpose an Arrow RecordBatch into row-oriented Records
pub fn record_batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>> {
    let num_rows = batch.num_rows();

    if num_rows == 0 {
        return Ok(Vec::new());
    }

    let mut columns: Vec<std::vec::IntoIter<Value>> = Vec::with_capacity(batch.num_columns());
    for (col_idx, field) in batch.schema().fields().iter().enumerate() {
        let array = batch.column(col_idx);
        let values = array_to_values(array.as_ref())
            .with_context(|| format!("Failed to convert column '{}'", field.name()))?;
        columns.push(values.into_iter());
    }

    let mut records = Vec::with_capacity(num_rows);
    for _ in 0..num_rows {
        let fields = columns
            .iter_mut()
            .map(|col| col.next().unwrap_or(Value::Null))
            .collect();
        records.push(Record { fields });
    }

    Ok(records)
}

/// Convert an Arrow array to one Value per slot
fn array_to_values(array: &dyn Array) -> Result<Vec<Value>> {
    let values = match array.data_type() {
        DataType::Null => vec![Value::Null; array.len()],
        DataType::Boolean => {
            map_values(as_boolean_array(array), |arr, i| Value::Bool(arr.value(i)))
        }
        DataType::Int8 => int_values::<Int8Type>(array),
        DataType::Int16 => int_values::<Int16Type>(array),
        DataType::Int32 => int_values::<Int32Type>(array),
        DataType::Int64 => int_values::<Int64Type>(array),
        DataType::UInt8 => int_values::<UInt8Type>(array),
        DataType::UInt16 => int_values::<UInt16Type>(array),
        DataType::UInt32 => int_values::<UInt32Type>(array),
        DataType::UInt64 => map_values(as_primitive_array::<UInt64Type>(array), |arr, i| {
            let raw = arr.value(i);
            i64::try_from(raw).map_or_else(|_| Value::Text(raw.to_string()), Value::Int)
        }),
        DataType::Float16 => map_values(as_primitive_array::<Float16Type>(array), |arr, i| {
            Value::Float(arr.value(i).to_f64())
        }),
        DataType::Float32 => map_values(as_primitive_array::<Float32Type>(array), |arr, i| {
            Value::Float(arr.value(i) as f64)
        }),
        DataType::Float64 => map_values(as_primitive_array::<Float64Type>(array), |arr, i| {
            Value::Float(arr.value(i))
        }),
        DataType::Utf8 => text_values(as_string_array(array), |arr, i| arr.value(i).to_string()),
        DataType::LargeUtf8 => {
            text_values(as_largestring_array(array), |arr, i| arr.value(i).to_string())
        }
        DataType::Binary => text_values(as_generic_binary_array::<i32>(array), |arr, i| {
            hex::encode(arr.value(i))
        }),
        DataType::LargeBinary => text_values(as_generic_binary_array::<i64>(array), |arr, i| {
            hex::encode(arr.value(i))
        }),
        DataType::Date32 => {
            let arr = as_primitive_array::<Date32Type>(array);
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("Invalid epoch")?;
            let mut values = Vec::with_capacity(arr.len());
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    let date = epoch
                        .checked_add_signed(chrono::Duration::days(arr.value(i) as i64))
                        .context("Invalid date")?;
                    Value::Text(date.format("%Y-%m-%d").to_string())
                });
            }
            values
        }
        DataType::Date64 => {
            let arr = as_primitive_array::<Date64Type>(array);
            let mut values = Vec::with_capacity(arr.len());
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    let datetime =
                        DateTime::from_timestamp_millis(arr.value(i)).context("Invalid date")?;
                    Value::Text(datetime.format("%Y-%m-%d").to_string())
                });
            }
            values
        }
        DataType::Timestamp(unit, _) => timestamp_values(array, unit)?,
        DataType::Decimal128(_, scale) => {
            let arr = as_primitive_array::<Decimal128Type>(array);
            let scale = (*scale).max(0) as u32;
            map_values(arr, |arr, i| {
                let text = format_decimal128(arr.value(i), scale);
                match text.parse::<f64>() {
                    Ok(f) => Value::Float(f),
                    Err(_) => Value::Text(text),
                }
            })
        }
        other => {
            return Err(anyhow::anyhow!(
                "Unsupported array type for conversion: {:?}",
                other
            ));
        }
    };

    Ok(values)
}

fn map_values<A: Array>(arr: &A, convert: impl Fn(&A, usize) -> Value) -> Vec<Value> {
    (0..arr.len())
        .map(|i| {
            if arr.is_null(i) {
                Value::Null
            } else {
                convert(arr, i)
            }
        })
        .collect()
}

fn text_values<A: Array>(arr: &A, render: impl Fn(&A, usize) -> String) -> Vec<Value> {
    map_values(arr, |arr, i| Value::Text(render(arr, i)))
}

fn int_values<T: ArrowPrimitiveType>(array: &dyn Array) -> Vec<Value>
where
    T::Native: Into<i64>,
{
    map_values(as_primitive_array::<T>(array), |arr, i| {
        Value::Int(arr.value(i).into())
    })
}

/// Timestamps are read as UTC wall-clock time regardless of the column's zone
fn timestamp_values(array: &dyn Array, unit: &TimeUnit) -> Result<Vec<Value>> {
    let to_datetime = |raw: i64| -> Option<DateTime<chrono::Utc>> {
        match unit {
            TimeUnit::Second => DateTime::from_timestamp(raw, 0),
            TimeUnit::Millisecond => DateTime::from_timestamp_millis(raw),
            TimeUnit::Microsecond => DateTime::from_timestamp_micros(raw),
            TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(raw)),
        }
    };

    let raw_values: Vec<Option<i64>> = match unit {
        TimeUnit::Second => as_primitive_array::<TimestampSecondType>(array).iter().collect(),
        TimeUnit::Millisecond => as_primitive_array::<TimestampMillisecondType>(array)
            .iter()
            .collect(),
        TimeUnit::Microsecond => as_primitive_array::<TimestampMicrosecondType>(array)
            .iter()
            .collect(),
        TimeUnit::Nanosecond => as_primitive_array::<TimestampNanosecondType>(array)
            .iter()
            .collect(),
    };

    raw_values
        .into_iter()
        .map(|raw| match raw {
            None => Ok(Value::Null),
            Some(raw) => to_datetime(raw)
                .map(|dt| Value::Timestamp(dt.naive_utc()))
                .with_context(|| format!("Invalid timestamp {}", raw)),
        })
        .collect()
}

/// Format a Decimal128 value with the given scale
fn format_decimal128(value: i128, scale: u32) -> String {
    if scale == 0 {
        return value.to_string();
    }

    let divisor = 10_i128.pow(scale);
    let int_part = value / divisor;
    let frac_part = (value % divisor).abs();
    let sign = if value < 0 && int_part == 0 { "-" } else { "" };

    format!(
        "{}{}.{:0width$}",
        sign,
        int_part,
        frac_part,
        width = scale as usize
    )
}
