use chrono::NaiveDateTime;
use std::path::Path;
use std::sync::Arc;

use super::delimited::reader::CsvBatchReader;
use super::parquet::ParquetBatchReader;
use crate::error::{IngestError, Result};

/// A single cell of a batch
///
/// CSV fields arrive as `Text`; Parquet columns keep their Arrow type as
/// `Bool`, `Int`, `Float` or `Timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Build a cell from a raw text field; empty fields are nulls
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Value::Null
        } else {
            Value::Text(field.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text rendering of a non-null cell
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(t) => Some(t.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        }
    }
}

/// A single record (row) from the file
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub fields: Vec<Value>,
}

/// Up to `chunk_size` consecutive rows sharing one header
#[derive(Debug, Clone)]
pub struct Batch {
    pub columns: Arc<[String]>,
    pub records: Vec<Record>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Parquet,
}

impl Format {
    /// Detect the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(Format::Csv),
            Some("parquet") => Ok(Format::Parquet),
            _ => Err(IngestError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Lazy, single-pass sequence of batches over a local file
///
/// Once an error has been yielded the reader is exhausted.
pub enum BatchReader {
    Csv(CsvBatchReader),
    Parquet(ParquetBatchReader),
}

impl BatchReader {
    /// Open `path` with the reader matching its extension
    ///
    /// A `chunk_size` of zero is rejected with `InvalidChunkSize`.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        match Format::from_path(path)? {
            Format::Csv => Ok(BatchReader::Csv(CsvBatchReader::open(path, chunk_size)?)),
            Format::Parquet => Ok(BatchReader::Parquet(ParquetBatchReader::open(
                path, chunk_size,
            )?)),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            BatchReader::Csv(_) => Format::Csv,
            BatchReader::Parquet(_) => Format::Parquet,
        }
    }

    pub fn columns(&self) -> &Arc<[String]> {
        match self {
            BatchReader::Csv(reader) => reader.columns(),
            BatchReader::Parquet(reader) => reader.columns(),
        }
    }
}

impl Iterator for BatchReader {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BatchReader::Csv(reader) => reader.next(),
            BatchReader::Parquet(reader) => reader.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn temp_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path(Path::new("trips.csv")).unwrap(), Format::Csv);
        assert_eq!(Format::from_path(Path::new("TRIPS.CSV")).unwrap(), Format::Csv);
        assert_eq!(
            Format::from_path(Path::new("/data/green_tripdata.parquet")).unwrap(),
            Format::Parquet
        );
    }

    #[test]
    fn test_unsupported_format() {
        for name in ["trips.tsv", "trips.json", "trips", "trips.csv.gz"] {
            let err = Format::from_path(Path::new(name)).unwrap_err();
            assert!(
                matches!(err, IngestError::UnsupportedFormat { .. }),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn test_open_dispatches_on_extension() {
        let file = temp_csv("id,name\n1,a\n");
        let reader = BatchReader::open(file.path(), 10).unwrap();
        assert_eq!(reader.format(), Format::Csv);
        assert_eq!(&**reader.columns(), &["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_zero_chunk_size_is_error() {
        let file = temp_csv("id\n1\n");
        for path in [file.path(), Path::new("missing.parquet")] {
            let err = BatchReader::open(path, 0).err().unwrap();
            assert!(matches!(err, IngestError::InvalidChunkSize), "{err}");
        }
    }

    #[test]
    fn test_reader_is_single_pass() {
        let file = temp_csv("id\n1\n2\n3\n");
        let mut reader = BatchReader::open(file.path(), 2).unwrap();

        assert_eq!(reader.next().unwrap().unwrap().len(), 2);
        assert_eq!(reader.next().unwrap().unwrap().len(), 1);
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_value_from_field() {
        assert_eq!(Value::from_field(""), Value::Null);
        assert_eq!(Value::from_field("x"), Value::Text("x".to_string()));
    }

    #[test]
    fn test_value_render() {
        assert_eq!(Value::Null.render(), None);
        assert_eq!(Value::Int(7).render().as_deref(), Some("7"));
        assert_eq!(Value::Float(2.5).render().as_deref(), Some("2.5"));
        assert_eq!(Value::Bool(true).render().as_deref(), Some("true"));
    }
}
