//! High-level runner API for the ingester.
//!
//! Wires the HTTP fetcher and the database connector into a [`Pipeline`] for
//! a single ingestion run. This is the entry point used by the CLI.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::db::{ConnectionParams, PoolConnector};
use crate::ingest::{IngestionJobBuilder, Pipeline};
use crate::io::HttpFetcher;

pub use crate::error::IngestError;
pub use crate::ingest::IngestReport;

/// Arguments for a single ingestion run
#[derive(Clone)]
pub struct IngestArgs {
    // Connection configuration
    pub db: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,

    // Target and source
    pub table_name: String,
    pub url: String,

    /// Directory downloads are written to
    pub download_dir: PathBuf,
}

/// Download `args.url` and append its rows to `args.table_name`
///
/// Fails without touching the database when the download is missing or
/// empty, and without reading the file when the database is unreachable.
///
/// # Example
///
/// ```no_run
/// use tabular_ingest::runner::{IngestArgs, run_ingest};
///
/// # async fn example() -> anyhow::Result<()> {
/// let args = IngestArgs {
///     db: "postgresql".to_string(),
///     user: "root".to_string(),
///     password: "root".to_string(),
///     host: "localhost".to_string(),
///     port: 5432,
///     database_name: "ny_taxi".to_string(),
///     table_name: "green_taxi_trips".to_string(),
///     url: "https://github.com/DataTalksClub/nyc-tlc-data/releases/download/green/green_tripdata_2019-01.csv.gz".to_string(),
///     download_dir: std::env::current_dir()?,
/// };
///
/// let report = run_ingest(args).await?;
/// println!("Appended {} rows in {:?}", report.stats.rows, report.duration);
/// # Ok(())
/// # }
/// ```
pub async fn run_ingest(args: IngestArgs) -> Result<IngestReport> {
    let connection = ConnectionParams {
        driver: args.db,
        user: args.user,
        password: args.password,
        host: args.host,
        port: args.port,
        database_name: args.database_name,
    };

    let job = IngestionJobBuilder::default()
        .source_url(args.url)
        .connection(connection.clone())
        .table_name(args.table_name)
        .build()
        .context("Invalid ingestion job")?;

    let fetcher = HttpFetcher::new(args.download_dir);
    let connector = PoolConnector::new(connection);

    let report = Pipeline::new(&job, &fetcher, &connector)
        .run()
        .await
        .with_context(|| format!("Ingestion job {} failed", job.job_id))?;

    Ok(report)
}
