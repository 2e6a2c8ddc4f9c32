//! Downloading remote lists into the list directory.
//!
//! Each [`Source`] is fetched with a plain GET and streamed to
//! `<dir>/<file name>`. A failed download is reported in its
//! [`DownloadOutcome`] and never stops the other sources.

use crate::error::HostCheckError;
use crate::types::Source;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Result of downloading one source.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub source: Source,
    /// Path written on success
    pub result: Result<PathBuf, HostCheckError>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Create the list directory and any missing parents.
///
/// Failure here is fatal for a run.
pub async fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<(), HostCheckError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        HostCheckError::directory(
            dir.to_string_lossy(),
            format!("Failed to create directory: {}", e),
        )
    })
}

/// Build the HTTP client used for list downloads.
pub fn download_client(timeout: Duration) -> Result<reqwest::Client, HostCheckError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            HostCheckError::network_with_source(
                "Failed to create download HTTP client",
                e.to_string(),
            )
        })
}

/// Download every source into `dir`, concurrently.
///
/// Outcomes are returned in the order of `sources`.
pub async fn download_sources(
    client: &reqwest::Client,
    sources: &[Source],
    dir: &Path,
) -> Vec<DownloadOutcome> {
    let downloads = sources.iter().map(|source| async move {
        let result = download_source(client, source, dir).await;
        match &result {
            Ok(path) => info!(url = %source.url, path = %path.display(), "downloaded list"),
            Err(e) => warn!(url = %source.url, error = %e, "list download failed"),
        }
        DownloadOutcome {
            source: source.clone(),
            result,
        }
    });

    join_all(downloads).await
}

/// Download one source, streaming the body to disk.
///
/// The body lands in a hidden `.part` file next to the target and is renamed
/// over it only once complete, so a failed download leaves any previous copy
/// untouched. Non-2xx responses are failures.
pub async fn download_source(
    client: &reqwest::Client,
    source: &Source,
    dir: &Path,
) -> Result<PathBuf, HostCheckError> {
    let file_name = source.target_file_name();
    let path = dir.join(&file_name);
    let part_path = dir.join(format!(".{}.part", file_name));
    debug!(url = %source.url, path = %path.display(), "downloading list");

    let response = client
        .get(&source.url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| HostCheckError::download(&source.url, e.to_string()))?;

    let written = match write_body(response, &source.url, &part_path).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&part_path, &path).await {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(HostCheckError::file_error(
            path.to_string_lossy(),
            format!("Failed to replace list file: {}", e),
        ));
    }

    debug!(url = %source.url, bytes = written, "list saved");
    Ok(path)
}

/// Stream a response body into `path`, returning the byte count.
async fn write_body(
    mut response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<usize, HostCheckError> {
    let write_error = |e: std::io::Error| {
        HostCheckError::file_error(
            path.to_string_lossy(),
            format!("Failed to write list file: {}", e),
        )
    };

    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
        HostCheckError::file_error(
            path.to_string_lossy(),
            format!("Failed to create list file: {}", e),
        )
    })?;

    let mut written = 0usize;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| HostCheckError::download(url, e.to_string()))?
    {
        file.write_all(&chunk).await.map_err(write_error)?;
        written += chunk.len();
    }

    file.flush().await.map_err(write_error)?;
    Ok(written)
}
