//! Parquet file reader implementation.

use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::conversion::record_batch_to_records;
use crate::error::{IngestError, Result};
use crate::formats::reader::Batch;

/// Columnar batch iterator over a Parquet file
///
/// Arrow decodes at most `chunk_size` rows at a time; each RecordBatch is
/// transposed into rows before it is handed out.
pub struct ParquetBatchReader {
    path: PathBuf,
    reader: ParquetRecordBatchReader,
    columns: Arc<[String]>,
    finished: bool,
}

impl ParquetBatchReader {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkSize);
        }

        let file = File::open(path)?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| IngestError::parse(path, "failed to read Parquet metadata", e))?;

        debug!(
            rows = builder.metadata().file_metadata().num_rows(),
            row_groups = builder.metadata().num_row_groups(),
            "opened Parquet file"
        );

        let columns: Arc<[String]> = builder
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();

        let reader = builder
            .with_batch_size(chunk_size)
            .build()
            .map_err(|e| IngestError::parse(path, "failed to build Parquet reader", e))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            columns,
            finished: false,
        })
    }

    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    fn convert(&self, batch: RecordBatch) -> Result<Batch> {
        let records = record_batch_to_records(&batch).map_err(|e| IngestError::Parse {
            path: self.path.clone(),
            message: format!("{:#}", e),
            source: None,
        })?;

        Ok(Batch {
            columns: Arc::clone(&self.columns),
            records,
        })
    }
}

impl Iterator for ParquetBatchReader {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let item = match self.reader.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(e)) => Err(IngestError::parse(
                    &self.path,
                    "failed to decode Parquet record batch",
                    e,
                )),
                Some(Ok(batch)) if batch.num_rows() == 0 => continue,
                Some(Ok(batch)) => self.convert(batch),
            };

            if item.is_err() {
                self.finished = true;
            }
            return Some(item);
        }
    }
}
