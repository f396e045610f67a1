use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{IngestError, Result};

/// Whether `path` names a gzip-compressed file
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Gunzip `path` next to itself if it ends in `.gz`
///
/// Returns the path of the decompressed file, or `path` unchanged when it is
/// not compressed. The compressed file is left in place.
pub async fn decompress_if_gzip(path: PathBuf) -> Result<PathBuf> {
    if !is_gzip(&path) {
        return Ok(path);
    }

    let target = path.with_extension("");
    let (source, dest) = (path.clone(), target.clone());

    let written = tokio::task::spawn_blocking(move || gunzip(&source, &dest))
        .await
        .map_err(std::io::Error::other)
        .and_then(|result| result)
        .map_err(|source| IngestError::Decompress {
            path: path.clone(),
            source,
        })?;

    info!(
        "Decompressed {} -> {} ({} bytes)",
        path.display(),
        target.display(),
        written
    );
    Ok(target)
}

/// Stream-decompress `source` into `target` via a temp file in the same directory
fn gunzip(source: &Path, target: &Path) -> std::io::Result<u64> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(source)?));
    let mut tmp = NamedTempFile::new_in(dir)?;
    let written = std::io::copy(&mut decoder, &mut tmp)?;

    // Rename into place so a failed decompression never leaves a truncated file
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(written)
}
