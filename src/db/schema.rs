use chrono::NaiveDateTime;

use super::pool::{BindValue, quote_ident};
use crate::formats::{Batch, Value};
use crate::ingest::normalize::parse_timestamp;

/// SQL data type of a target column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    Boolean,
    BigInt,
    DoublePrecision,
    Text,
    Timestamp,
    TimestampTz,
    /// Any other type; values are bound as text and cast by the database
    Other(String),
}

impl SqlType {
    /// Returns the type name used in DDL
    pub fn to_sql(&self) -> &str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::BigInt => "BIGINT",
            SqlType::DoublePrecision => "DOUBLE PRECISION",
            SqlType::Text => "TEXT",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            SqlType::Other(name) => name.as_str(),
        }
    }

    /// Map a type name reported by the database catalog
    pub fn from_catalog(data_type: &str) -> SqlType {
        match data_type.trim().to_uppercase().as_str() {
            "BOOLEAN" | "BOOL" => SqlType::Boolean,
            "SMALLINT" | "INT2" | "INTEGER" | "INT" | "INT4" | "BIGINT" | "INT8" => SqlType::BigInt,
            "REAL" | "FLOAT4" | "DOUBLE PRECISION" | "FLOAT8" | "FLOAT" | "NUMERIC"
            | "DECIMAL" => SqlType::DoublePrecision,
            "TEXT" | "CHARACTER VARYING" | "VARCHAR" | "CHARACTER" | "CHAR" | "BPCHAR" => {
                SqlType::Text
            }
            "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => SqlType::Timestamp,
            "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => SqlType::TimestampTz,
            other => SqlType::Other(other.to_string()),
        }
    }

    /// Find the most specific common type that accommodates both types
    fn common_type(&self, other: &SqlType) -> SqlType {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (SqlType::BigInt, SqlType::DoublePrecision)
            | (SqlType::DoublePrecision, SqlType::BigInt) => SqlType::DoublePrecision,
            _ => SqlType::Text,
        }
    }

    fn infer_value_type(value: &Value) -> Option<SqlType> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(SqlType::Boolean),
            Value::Int(_) => Some(SqlType::BigInt),
            Value::Float(_) => Some(SqlType::DoublePrecision),
            Value::Timestamp(_) => Some(SqlType::Timestamp),
            Value::Text(text) => {
                let trimmed = text.trim();
                if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
                    Some(SqlType::Boolean)
                } else if trimmed.parse::<i64>().is_ok() {
                    Some(SqlType::BigInt)
                } else if trimmed.parse::<f64>().is_ok() {
                    Some(SqlType::DoublePrecision)
                } else {
                    Some(SqlType::Text)
                }
            }
        }
    }

    /// Convert a cell into a bindable value of this type
    pub fn bind_value(&self, value: &Value) -> Result<BindValue, String> {
        if value.is_null() {
            return Ok(self.null());
        }

        let mismatch = || format!("cannot store {} in a {} column", describe(value), self.to_sql());

        Ok(match self {
            SqlType::Boolean => match value {
                Value::Bool(b) => BindValue::Bool(Some(*b)),
                Value::Int(0) => BindValue::Bool(Some(false)),
                Value::Int(1) => BindValue::Bool(Some(true)),
                Value::Text(t) => match t.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => BindValue::Bool(Some(true)),
                    "false" | "f" | "0" => BindValue::Bool(Some(false)),
                    _ => return Err(mismatch()),
                },
                _ => return Err(mismatch()),
            },
            SqlType::BigInt => match value {
                Value::Int(i) => BindValue::BigInt(Some(*i)),
                Value::Float(f) => BindValue::BigInt(Some(round_to_i64(*f).ok_or_else(mismatch)?)),
                Value::Text(t) => {
                    let t = t.trim();
                    let parsed = match t.parse::<i64>() {
                        Ok(i) => Some(i),
                        Err(_) => t.parse::<f64>().ok().and_then(round_to_i64),
                    };
                    BindValue::BigInt(Some(parsed.ok_or_else(mismatch)?))
                }
                _ => return Err(mismatch()),
            },
            SqlType::DoublePrecision => match value {
                Value::Int(i) => BindValue::Double(Some(*i as f64)),
                Value::Float(f) => BindValue::Double(Some(*f)),
                Value::Text(t) => BindValue::Double(Some(t.trim().parse().map_err(|_| mismatch())?)),
                _ => return Err(mismatch()),
            },
            SqlType::Timestamp => BindValue::Timestamp(Some(as_timestamp(value).ok_or_else(mismatch)?)),
            SqlType::TimestampTz => {
                BindValue::TimestampTz(Some(as_timestamp(value).ok_or_else(mismatch)?.and_utc()))
            }
            SqlType::Text | SqlType::Other(_) => {
                BindValue::Text(Some(value.render().unwrap_or_default()))
            }
        })
    }

    fn null(&self) -> BindValue {
        match self {
            SqlType::Boolean => BindValue::Bool(None),
            SqlType::BigInt => BindValue::BigInt(None),
            SqlType::DoublePrecision => BindValue::Double(None),
            SqlType::Timestamp => BindValue::Timestamp(None),
            SqlType::TimestampTz => BindValue::TimestampTz(None),
            SqlType::Text | SqlType::Other(_) => BindValue::Text(None),
        }
    }
}

/// Round a float into an integer column the way a float-to-bigint cast does
///
/// Halves round to even; NaN, infinities and out-of-range values are rejected.
fn round_to_i64(value: f64) -> Option<i64> {
    let rounded = value.round_ties_even();
    // i64::MAX is not representable as f64; 2^63 is the first value out of range
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < 9_223_372_036_854_775_808.0 {
        Some(rounded as i64)
    } else {
        None
    }
}

fn as_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::Text(t) => parse_timestamp(t),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Text(t) => format!("'{}'", t),
        Value::Timestamp(ts) => format!("timestamp {}", ts),
        Value::Null => "NULL".to_string(),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => value.render().unwrap_or_default(),
    }
}

/// A table column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
}

/// Column layout of a target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Build from `(column_name, data_type)` catalog rows
    pub fn from_catalog(rows: Vec<(String, String)>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        Some(Self {
            columns: rows
                .into_iter()
                .map(|(name, data_type)| Column {
                    sql_type: SqlType::from_catalog(&data_type),
                    name,
                })
                .collect(),
        })
    }

    /// Infer column types from the values of a batch
    ///
    /// Columns with only nulls, or with values of incompatible kinds, become TEXT.
    pub fn infer(batch: &Batch) -> Self {
        let columns = batch
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let mut inferred: Option<SqlType> = None;
                for record in &batch.records {
                    let Some(value_type) = record.fields.get(idx).and_then(SqlType::infer_value_type)
                    else {
                        continue;
                    };
                    inferred = Some(match inferred {
                        None => value_type,
                        Some(current) => current.common_type(&value_type),
                    });
                    if inferred == Some(SqlType::Text) {
                        break;
                    }
                }

                Column {
                    name: name.clone(),
                    sql_type: inferred.unwrap_or(SqlType::Text),
                }
            })
            .collect();

        Self { columns }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Generate CREATE TABLE DDL
    pub fn create_table_ddl(&self, table_name: &str) -> String {
        let column_defs: Vec<String> = self
            .columns
            .iter()
            .map(|col| format!("{} {}", quote_ident(&col.name), col.sql_type.to_sql()))
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(table_name),
            column_defs.join(", ")
        )
    }

    /// Resolve the table column for each batch column, in batch order
    pub fn columns_for(&self, batch_columns: &[String]) -> Result<Vec<Column>, String> {
        let missing: Vec<&str> = batch_columns
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(format!(
                "table has no column(s) named {}",
                missing.join(", ")
            ));
        }

        Ok(batch_columns
            .iter()
            .filter_map(|name| self.column(name).cloned())
            .collect())
    }
}
