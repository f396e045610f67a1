use derive_builder::Builder;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use super::normalize::normalize_timestamps;
use crate::config::{CHUNK_SIZE, TIMESTAMP_COLUMNS};
use crate::db::{BatchSink, ConnectionParams, Connector};
use crate::error::{IngestError, Result};
use crate::formats::{Batch, BatchReader};
use crate::io::Fetcher;
use crate::telemetry::{BatchEvent, IngestStats};

/// One ingestion run: where the data comes from and where it goes
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct IngestionJob {
    #[builder(default = "Uuid::new_v4()")]
    pub job_id: Uuid,
    #[builder(setter(into))]
    pub source_url: String,
    pub connection: ConnectionParams,
    #[builder(setter(into))]
    pub table_name: String,
    #[builder(default = "CHUNK_SIZE")]
    pub chunk_size: usize,
    #[builder(default = "TIMESTAMP_COLUMNS.iter().map(|c| c.to_string()).collect()")]
    pub timestamp_columns: Vec<String>,
}

impl IngestionJobBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.chunk_size == Some(0) {
            return Err("chunk_size must be at least 1".to_string());
        }
        if self
            .table_name
            .as_ref()
            .is_some_and(|table| table.trim().is_empty())
        {
            return Err("table_name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub job_id: Uuid,
    pub source_path: PathBuf,
    pub stats: IngestStats,
    pub duration: Duration,
}

/// The ordered steps of an ingestion run
///
/// `run` executes fetch, download check, connect, open and ingest in that
/// order and stops at the first failure, so an empty download never reaches
/// the database and a failed connection never opens the file.
pub struct Pipeline<'a, F, C> {
    job: &'a IngestionJob,
    fetcher: &'a F,
    connector: &'a C,
}

impl<'a, F, C> Pipeline<'a, F, C>
where
    F: Fetcher,
    C: Connector,
{
    pub fn new(job: &'a IngestionJob, fetcher: &'a F, connector: &'a C) -> Self {
        Self {
            job,
            fetcher,
            connector,
        }
    }

    pub async fn run(&self) -> Result<IngestReport> {
        let started = Instant::now();
        info!(
            "Starting ingestion job {} into table '{}'",
            self.job.job_id, self.job.table_name
        );

        let path = self.fetch_source().await?;
        self.check_download(&path).await?;
        let mut sink = self.connect().await?;
        let reader = self.open_reader(&path)?;
        let stats = self.ingest(reader, &mut sink).await?;

        let duration = started.elapsed();
        info!(
            "Ingestion complete: {} batches, {} rows in {:.2}s",
            stats.batches,
            stats.rows,
            duration.as_secs_f64()
        );

        Ok(IngestReport {
            job_id: self.job.job_id,
            source_path: path,
            stats,
            duration,
        })
    }

    /// Step 1: retrieve the source to local storage
    pub async fn fetch_source(&self) -> Result<PathBuf> {
        info!("Step 1: fetching {}", self.job.source_url);
        self.fetcher.fetch(&self.job.source_url).await
    }

    /// Step 2: the fetched file must exist and be non-empty
    pub async fn check_download(&self, path: &Path) -> Result<u64> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                info!("Step 2: {} is ready ({} bytes)", path.display(), meta.len());
                Ok(meta.len())
            }
            _ => Err(IngestError::EmptyDownload {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Step 3: the database must be reachable before any data is read
    pub async fn connect(&self) -> Result<C::Sink> {
        info!("Step 3: connecting to {}", self.job.connection.redacted());
        self.connector.connect().await
    }

    /// Step 4: open the chunked reader for the file's format
    pub fn open_reader(&self, path: &Path) -> Result<BatchReader> {
        let reader = BatchReader::open(path, self.job.chunk_size)?;
        info!(
            "Step 4: reading {} as {:?} ({} columns) in chunks of {} rows",
            path.display(),
            reader.format(),
            reader.columns().len(),
            self.job.chunk_size
        );
        Ok(reader)
    }

    /// Step 5: normalize and append every batch, one at a time
    ///
    /// Batches already appended stay committed when a later one fails; the
    /// error is then wrapped in [`IngestError::PartialIngest`].
    pub async fn ingest<R, S>(&self, mut reader: R, sink: &mut S) -> Result<IngestStats>
    where
        R: Iterator<Item = Result<Batch>>,
        S: BatchSink,
    {
        info!("Step 5: appending batches to '{}'", self.job.table_name);
        let mut stats = IngestStats::new();
        let mut rows_read = 0;

        loop {
            let Some(next) = reader.next() else {
                break;
            };
            let started = Instant::now();

            let rows = match self.append_batch(next, &mut rows_read, sink).await {
                Ok(rows) => rows,
                Err(source) if stats.batches > 0 => {
                    return Err(IngestError::PartialIngest {
                        committed_batches: stats.batches,
                        committed_rows: stats.rows,
                        source: Box::new(source),
                    });
                }
                Err(e) => return Err(e),
            };

            let event = BatchEvent {
                rows,
                duration: started.elapsed(),
            };
            stats.record(&event);

            info!("inserted chunk took {:.3} second", event.duration.as_secs_f64());
            debug!(
                job_id = %self.job.job_id,
                batch = stats.batches,
                rows,
                total_rows = stats.rows,
                "batch committed"
            );
        }

        Ok(stats)
    }

    async fn append_batch<S: BatchSink>(
        &self,
        next: Result<Batch>,
        rows_read: &mut usize,
        sink: &mut S,
    ) -> Result<u64> {
        let batch = next?;
        let first_row = *rows_read;
        *rows_read += batch.len();

        let normalized =
            normalize_timestamps(batch, self.job.timestamp_columns.as_slice(), first_row)?;
        sink.append(&self.job.table_name, &normalized).await
    }
}
