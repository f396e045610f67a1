//! The chunked ingestion loop and its timestamp normalization

pub mod normalize;
pub mod pipeline;

pub use normalize::{NormalizedBatch, normalize_timestamps, parse_timestamp};
pub use pipeline::{IngestReport, IngestionJob, IngestionJobBuilder, Pipeline};
