//! Error taxonomy for an ingestion run
//!
//! Every variant is fatal to the run. Nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to download {url}")]
    Download {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to decompress {}", path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("downloaded file {} is missing or empty", path.display())]
    EmptyDownload { path: PathBuf },

    #[error("unsupported database driver '{0}' (supported: postgresql, postgres)")]
    UnsupportedDriver(String),

    #[error("failed to connect to {target}")]
    Connection {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("chunk size must be at least 1")]
    InvalidChunkSize,

    #[error("unsupported file format for {} (supported extensions: .csv, .parquet)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("column '{column}' row {row}: cannot parse '{value}' as a timestamp")]
    TimestampParse {
        column: String,
        row: usize,
        value: String,
    },

    #[error("batch is missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("batch does not match the schema of table '{table}': {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("database error while writing table '{table}'")]
    Database {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(
        "ingestion aborted after {committed_batches} committed batch(es) ({committed_rows} rows remain in the table)"
    )]
    PartialIngest {
        committed_batches: usize,
        committed_rows: u64,
        #[source]
        source: Box<IngestError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// The underlying failure, looking through `PartialIngest`
    pub fn root(&self) -> &IngestError {
        match self {
            IngestError::PartialIngest { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn parse(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        IngestError::Parse {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
