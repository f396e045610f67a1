use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};

use super::pool::{Pool, Statement, quote_ident};
use super::schema::{Column, SqlType, TableSchema};
use super::BatchSink;
use crate::error::{IngestError, Result};
use crate::formats::{Record, Value};
use crate::ingest::NormalizedBatch;

/// Appends normalized batches to database tables
///
/// The target schema is resolved on the first append to each table: an
/// existing table's catalog is used as-is, a missing table is created from
/// types inferred from that first batch. Each batch is written in its own
/// transaction.
pub struct TableAppender {
    pool: Pool,
    schemas: HashMap<String, TableSchema>,
}

impl TableAppender {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            schemas: HashMap::new(),
        }
    }

    /// Resolve (and if needed create) the schema of `table`
    async fn resolve_schema(&mut self, table: &str, batch: &NormalizedBatch) -> Result<TableSchema> {
        if let Some(schema) = self.schemas.get(table) {
            return Ok(schema.clone());
        }

        let db_error = |source| IngestError::Database {
            table: table.to_string(),
            source,
        };

        let existing = self.pool.table_columns(table).await.map_err(db_error)?;

        let schema = match TableSchema::from_catalog(existing) {
            Some(schema) => {
                info!(
                    "Appending to existing table '{}' ({} columns)",
                    table,
                    schema.columns.len()
                );
                schema
            }
            None => {
                let schema = TableSchema::infer(batch.batch());
                info!(
                    "Creating table '{}' with {} inferred columns",
                    table,
                    schema.columns.len()
                );
                let ddl = schema.create_table_ddl(table);
                debug!(%ddl, "create table");
                self.pool.execute_query(&ddl).await.map_err(db_error)?;
                schema
            }
        };

        self.schemas.insert(table.to_string(), schema.clone());
        Ok(schema)
    }

    /// Build a multi-row INSERT for `rows` starting at parameter 1
    fn insert_statement(
        &self,
        table: &str,
        columns: &[Column],
        rows: &[Record],
    ) -> Result<Statement> {
        let use_pg_cast = self.pool.is_postgres();
        let column_list: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();

        let mut value_groups = Vec::with_capacity(rows.len());
        let mut params = Vec::with_capacity(rows.len() * columns.len());
        let mut param_idx = 1;
        let null = Value::Null;

        for record in rows {
            let mut placeholders = Vec::with_capacity(columns.len());

            for (col_idx, column) in columns.iter().enumerate() {
                let value = record.fields.get(col_idx).unwrap_or(&null);
                let bound = column
                    .sql_type
                    .bind_value(value)
                    .map_err(|detail| IngestError::SchemaMismatch {
                        table: table.to_string(),
                        detail: format!("column '{}': {}", column.name, detail),
                    })?;
                params.push(bound);

                let placeholder = self.pool.placeholder(param_idx);
                param_idx += 1;

                // Types we bind as text need an explicit cast on Postgres
                placeholders.push(match &column.sql_type {
                    SqlType::Other(type_name) if use_pg_cast => {
                        format!("CAST({} AS {})", placeholder, type_name)
                    }
                    _ => placeholder,
                });
            }

            value_groups.push(format!("({})", placeholders.join(", ")));
        }

        Ok(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES {}",
                quote_ident(table),
                column_list.join(", "),
                value_groups.join(", ")
            ),
            params,
        })
    }
}

#[async_trait]
impl BatchSink for TableAppender {
    async fn append(&mut self, table: &str, batch: &NormalizedBatch) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let schema = self.resolve_schema(table, batch).await?;
        let columns = schema
            .columns_for(&batch.batch().columns)
            .map_err(|detail| IngestError::SchemaMismatch {
                table: table.to_string(),
                detail,
            })?;

        let rows_per_statement = (self.pool.max_bind_params() / columns.len().max(1)).max(1);

        // Convert every statement up front so a mismatch fails before anything is written
        let statements = batch
            .batch()
            .records
            .chunks(rows_per_statement)
            .map(|rows| self.insert_statement(table, &columns, rows))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            statements = statements.len(),
            rows = batch.len(),
            "appending batch"
        );

        self.pool
            .execute_in_transaction(statements)
            .await
            .map_err(|source| IngestError::Database {
                table: table.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TIMESTAMP_COLUMNS;
    use crate::formats::Batch;
    use crate::ingest::normalize_timestamps;
    use std::sync::Arc;

    fn trips(columns: &[&str], rows: Vec<Vec<&str>>) -> NormalizedBatch {
        let batch = Batch {
            columns: Arc::from(
                columns
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>(),
            ),
            records: rows
                .into_iter()
                .map(|row| Record {
                    fields: row.into_iter().map(Value::from_field).collect(),
                })
                .collect(),
        };
        normalize_timestamps(batch, &TIMESTAMP_COLUMNS, 0).unwrap()
    }

    const COLUMNS: [&str; 4] = [
        "VendorID",
        "lpep_pickup_datetime",
        "lpep_dropoff_datetime",
        "fare_amount",
    ];

    #[tokio::test]
    async fn test_append_creates_table_on_first_use() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        let mut appender = TableAppender::new(pool.clone());

        let batch = trips(
            &COLUMNS,
            vec![
                vec!["2", "2021-01-01 00:15:56", "2021-01-01 00:19:52", "5.5"],
                vec!["1", "2021-01-01 00:25:59", "2021-01-01 00:34:44", ""],
            ],
        );

        let rows = appender.append("green_taxi", &batch).await.unwrap();
        assert_eq!(rows, 2);

        let columns = pool.table_columns("green_taxi").await.unwrap();
        let types: Vec<&str> = columns.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(types, vec!["BIGINT", "TIMESTAMP", "TIMESTAMP", "DOUBLE PRECISION"]);

        let pickups = pool
            .fetch_strings("SELECT lpep_pickup_datetime FROM green_taxi ORDER BY VendorID")
            .await
            .unwrap();
        assert_eq!(
            pickups,
            vec![
                Some("2021-01-01 00:25:59".to_string()),
                Some("2021-01-01 00:15:56".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_append_to_existing_table() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        pool.execute_query(
            "CREATE TABLE green_taxi (\"VendorID\" BIGINT, lpep_pickup_datetime TIMESTAMP, \
             lpep_dropoff_datetime TIMESTAMP, fare_amount DOUBLE PRECISION, extra TEXT)",
        )
        .await
        .unwrap();

        let mut appender = TableAppender::new(pool.clone());
        let batch = trips(
            &COLUMNS,
            vec![vec!["2", "2021-01-01 00:15:56", "2021-01-01 00:19:52", "5.5"]],
        );

        appender.append("green_taxi", &batch).await.unwrap();
        appender.append("green_taxi", &batch).await.unwrap();

        assert_eq!(
            pool.count("SELECT COUNT(*) FROM green_taxi").await.unwrap(),
            2
        );
        assert_eq!(
            pool.count("SELECT COUNT(*) FROM green_taxi WHERE extra IS NULL")
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_unknown_column_is_schema_mismatch() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        pool.execute_query(
            "CREATE TABLE green_taxi (lpep_pickup_datetime TIMESTAMP, lpep_dropoff_datetime TIMESTAMP)",
        )
        .await
        .unwrap();

        let mut appender = TableAppender::new(pool.clone());
        let batch = trips(
            &COLUMNS,
            vec![vec!["2", "2021-01-01 00:15:56", "2021-01-01 00:19:52", "5.5"]],
        );

        let err = appender.append("green_taxi", &batch).await.unwrap_err();
        match err {
            IngestError::SchemaMismatch { detail, .. } => {
                assert!(detail.contains("VendorID"), "{detail}");
                assert!(detail.contains("fare_amount"), "{detail}");
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_incompatible_value_is_schema_mismatch_and_writes_nothing() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        let mut appender = TableAppender::new(pool.clone());

        let first = trips(
            &COLUMNS,
            vec![vec!["2", "2021-01-01 00:15:56", "2021-01-01 00:19:52", "5.5"]],
        );
        appender.append("green_taxi", &first).await.unwrap();

        let second = trips(
            &COLUMNS,
            vec![
                vec!["1", "2021-01-01 00:25:59", "2021-01-01 00:34:44", "1.0"],
                vec!["unknown", "2021-01-01 00:25:59", "2021-01-01 00:34:44", "1.0"],
            ],
        );
        let err = appender.append("green_taxi", &second).await.unwrap_err();

        assert!(matches!(err, IngestError::SchemaMismatch { .. }), "{err}");
        assert_eq!(
            pool.count("SELECT COUNT(*) FROM green_taxi").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_large_batch_is_split_into_statements() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        let mut appender = TableAppender::new(pool.clone());

        // 4 columns * 10,000 rows is above SQLite's bind parameter limit
        let rows: Vec<Vec<String>> = (0..10_000)
            .map(|i| {
                vec![
                    i.to_string(),
                    "2021-01-01 00:15:56".to_string(),
                    "2021-01-01 00:19:52".to_string(),
                    format!("{}.25", i),
                ]
            })
            .collect();
        let batch = trips(
            &COLUMNS,
            rows.iter()
                .map(|r| r.iter().map(|s| s.as_str()).collect())
                .collect(),
        );

        let written = appender.append("green_taxi", &batch).await.unwrap();

        assert_eq!(written, 10_000);
        assert_eq!(
            pool.count("SELECT COUNT(*) FROM green_taxi").await.unwrap(),
            10_000
        );
    }
}
