//! Parquet file format support.
//!
//! Batches are decoded by Arrow and converted from columnar to row-based
//! Records before they reach the ingestion loop.

mod conversion;
mod reader;

pub use reader::ParquetBatchReader;
