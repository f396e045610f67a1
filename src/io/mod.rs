//! Source retrieval: URL parsing, streaming download and gzip extraction

pub mod download;
pub mod gzip;
pub mod uri;

pub use download::{Fetcher, HttpFetcher};
pub use uri::SourceUri;
