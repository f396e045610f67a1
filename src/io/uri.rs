use std::path::PathBuf;
use url::Url;

use crate::error::{IngestError, Result};

/// Represents a parsed source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUri {
    Http(Url),
    Local(PathBuf),
}

impl SourceUri {
    /// Parse a URL or path string into a SourceUri
    pub fn parse(uri: &str) -> Result<Self> {
        let unsupported = |message: String| IngestError::Download {
            url: uri.to_string(),
            source: message.into(),
        };

        // Try parsing as URL first
        match Url::parse(uri) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(SourceUri::Http(url)),
                "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|_| unsupported(format!("invalid file:// URL: {}", uri)))?;
                    Ok(SourceUri::Local(path))
                }
                // A Windows drive letter parses as a one-letter scheme
                scheme if scheme.len() == 1 => Ok(SourceUri::Local(PathBuf::from(uri))),
                scheme => Err(unsupported(format!("unsupported URL scheme: {}", scheme))),
            },
            // Treat as local file path
            Err(_) => Ok(SourceUri::Local(PathBuf::from(uri))),
        }
    }

    /// Name of the file the source is stored under locally
    ///
    /// For URLs this is the last non-empty path segment.
    pub fn file_name(&self) -> Option<String> {
        match self {
            SourceUri::Http(url) => url
                .path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                .map(str::to_string),
            SourceUri::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
    }
}

impl std::fmt::Display for SourceUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceUri::Http(url) => write!(f, "{}", url),
            SourceUri::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_https_url() {
        let uri = SourceUri::parse(
            "https://github.com/DataTalksClub/nyc-tlc-data/releases/download/green/green_tripdata_2021-01.csv.gz",
        )
        .unwrap();

        match &uri {
            SourceUri::Http(url) => assert_eq!(url.host_str(), Some("github.com")),
            _ => panic!("Expected HTTP URI"),
        }
        assert_eq!(uri.file_name().as_deref(), Some("green_tripdata_2021-01.csv.gz"));
    }

    #[test]
    fn test_file_name_ignores_query_and_trailing_slash() {
        let uri = SourceUri::parse("http://example.com/data/trips.parquet?token=abc").unwrap();
        assert_eq!(uri.file_name().as_deref(), Some("trips.parquet"));

        let uri = SourceUri::parse("http://example.com/data/trips.csv/").unwrap();
        assert_eq!(uri.file_name().as_deref(), Some("trips.csv"));

        let uri = SourceUri::parse("http://example.com/").unwrap();
        assert_eq!(uri.file_name(), None);
    }

    #[test]
    fn test_parse_local_path() {
        let uri = SourceUri::parse("/data/file.csv").unwrap();
        assert_eq!(uri, SourceUri::Local(PathBuf::from("/data/file.csv")));
        assert_eq!(uri.file_name().as_deref(), Some("file.csv"));
    }

    #[test]
    fn test_parse_relative_path() {
        let uri = SourceUri::parse("data/file.csv").unwrap();
        assert!(matches!(uri, SourceUri::Local(_)));
    }

    #[test]
    fn test_parse_file_uri() {
        let uri = SourceUri::parse("file:///data/file.csv").unwrap();
        assert!(matches!(uri, SourceUri::Local(_)));
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        let result = SourceUri::parse("ftp://example.com/file.csv");
        assert!(matches!(result, Err(IngestError::Download { .. })));
    }
}
