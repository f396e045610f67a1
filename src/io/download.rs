use async_trait::async_trait;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;
use url::Url;

use super::gzip::decompress_if_gzip;
use super::uri::SourceUri;
use crate::config::{DOWNLOAD_PROGRESS_TEMPLATE, DOWNLOAD_SPINNER_TEMPLATE};
use crate::error::{IngestError, Result};

/// Retrieves a source to local storage
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return the path of the (decompressed) local file
    async fn fetch(&self, url: &str) -> Result<PathBuf>;
}

/// Downloads `http(s)` sources into a directory; local paths are used in place
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    download_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            download_dir: download_dir.into(),
        }
    }

    /// Stream the response body for `url` into `dest`, overwriting it
    async fn download(&self, url: &Url, dest: &Path) -> Result<u64> {
        let download_error = |source: reqwest::Error| IngestError::Download {
            url: url.to_string(),
            source: Box::new(source),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(download_error)?;

        let bar = download_bar(response.content_length());
        let mut file = tokio::fs::File::create(dest).await?;
        let mut received = 0u64;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(download_error)?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            bar.inc(chunk.len() as u64);
        }
        file.flush().await?;
        bar.finish();

        Ok(received)
    }
}

fn download_bar(total: Option<u64>) -> ProgressBar {
    let (bar, template) = match total {
        Some(len) => (ProgressBar::new(len), DOWNLOAD_PROGRESS_TEMPLATE),
        None => (ProgressBar::new_spinner(), DOWNLOAD_SPINNER_TEMPLATE),
    };
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<PathBuf> {
        let source = SourceUri::parse(url)?;

        let local = match &source {
            SourceUri::Local(path) => {
                info!("Using local file {}", path.display());
                path.clone()
            }
            SourceUri::Http(remote) => {
                let name = source.file_name().ok_or_else(|| IngestError::Download {
                    url: url.to_string(),
                    source: "URL has no file name to save the download under".into(),
                })?;
                let dest = self.download_dir.join(name);

                info!("Downloading {} to {}", remote, dest.display());
                let bytes = self.download(remote, &dest).await?;
                info!("Downloaded {} bytes", bytes);
                dest
            }
        };

        decompress_if_gzip(local).await
    }
}
