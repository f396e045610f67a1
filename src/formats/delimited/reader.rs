use csv::StringRecord;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IngestError, Result};
use crate::formats::reader::{Batch, Record, Value};

/// Row-chunked CSV reader
///
/// The first line is the header. Records are pulled from the underlying
/// buffered reader `chunk_size` at a time, so only one batch is held in
/// memory.
pub struct CsvBatchReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    columns: Arc<[String]>,
    chunk_size: usize,
    finished: bool,
}

impl CsvBatchReader {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkSize);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| IngestError::parse(path, "failed to open CSV file", e))?;

        let columns: Arc<[String]> = reader
            .headers()
            .map_err(|e| IngestError::parse(path, "failed to read CSV header", e))?
            .iter()
            .map(|name| name.trim().to_string())
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            columns,
            chunk_size,
            finished: false,
        })
    }

    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    fn read_batch(&mut self) -> Result<Option<Batch>> {
        let mut records = Vec::with_capacity(self.chunk_size.min(8192));
        let mut row = StringRecord::new();

        while records.len() < self.chunk_size {
            let more = self.reader.read_record(&mut row).map_err(|e| {
                let message = match e.position() {
                    Some(pos) => format!("malformed CSV record at line {}", pos.line()),
                    None => "malformed CSV record".to_string(),
                };
                IngestError::parse(&self.path, message, e)
            })?;

            if !more {
                self.finished = true;
                break;
            }

            records.push(Record {
                fields: row.iter().map(Value::from_field).collect(),
            });
        }

        if records.is_empty() {
            return Ok(None);
        }

        Ok(Some(Batch {
            columns: Arc::clone(&self.columns),
            records,
        }))
    }
}

impl Iterator for CsvBatchReader {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
