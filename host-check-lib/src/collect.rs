//! Domain collection from a directory of list files.
//!
//! Every regular file in the directory is read, each line goes through the
//! extractor, and the results are merged into one set so duplicates within
//! and across files collapse to a single entry.

use crate::error::HostCheckError;
use crate::extract::extract_domains;
use crate::types::{Domain, UnreadablePolicy};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How many list files are read at the same time.
const FILE_READ_CONCURRENCY: usize = 16;

/// Collect the unique domains of every list file in `dir`.
///
/// Subdirectories are ignored. A directory that cannot be listed is always
/// an error; an unreadable file is handled according to `policy`.
///
/// # Example
///
/// ```rust,no_run
/// use host_check_lib::{collect_domains, UnreadablePolicy};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let domains = collect_domains("whitelists", UnreadablePolicy::Fail).await?;
///     println!("{} unique domains", domains.len());
///     Ok(())
/// }
/// ```
pub async fn collect_domains<P: AsRef<Path>>(
    dir: P,
    policy: UnreadablePolicy,
) -> Result<HashSet<Domain>, HostCheckError> {
    let dir = dir.as_ref();
    let files = list_files(dir, policy).await?;
    debug!(dir = %dir.display(), files = files.len(), "listed list directory");

    let domains = collect_domains_from_files(&files, policy).await?;
    info!(
        dir = %dir.display(),
        files = files.len(),
        domains = domains.len(),
        "collected domains"
    );
    Ok(domains)
}

/// Collect the unique domains of an explicit set of list files.
///
/// Files are read concurrently; they are independent and read-only.
pub async fn collect_domains_from_files(
    files: &[PathBuf],
    policy: UnreadablePolicy,
) -> Result<HashSet<Domain>, HostCheckError> {
    let mut reads = stream::iter(files.iter().cloned())
        .map(|path| async move {
            let result = read_list_file(&path).await;
            (path, result)
        })
        .buffer_unordered(FILE_READ_CONCURRENCY);

    let mut domains = HashSet::new();
    while let Some((path, result)) = reads.next().await {
        match result {
            Ok(file_domains) => {
                debug!(file = %path.display(), entries = file_domains.len(), "read list file");
                domains.extend(file_domains);
            }
            Err(e) => match policy {
                UnreadablePolicy::Fail => return Err(e),
                UnreadablePolicy::Skip => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable list file");
                }
            },
        }
    }

    Ok(domains)
}

/// Read one list file and extract its domains, duplicates included.
///
/// Invalid UTF-8 is replaced rather than rejected so one stray byte does
/// not discard a whole list.
pub async fn read_list_file(path: &Path) -> Result<Vec<Domain>, HostCheckError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        HostCheckError::file_error(
            path.to_string_lossy(),
            format!("Failed to read list file: {}", e),
        )
    })?;

    let text = String::from_utf8_lossy(&bytes);
    Ok(extract_domains(&text).collect())
}

/// List the regular files of `dir`, sorted by path.
async fn list_files(dir: &Path, policy: UnreadablePolicy) -> Result<Vec<PathBuf>, HostCheckError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        HostCheckError::directory(
            dir.to_string_lossy(),
            format!("Failed to list directory: {}", e),
        )
    })?;

    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                return Err(HostCheckError::directory(
                    dir.to_string_lossy(),
                    format!("Failed to list directory: {}", e),
                ))
            }
        };

        let path = entry.path();
        // Follows symlinks, so a linked list file counts as a file.
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => debug!(path = %path.display(), "ignoring non-file entry"),
            Err(e) => {
                let err = HostCheckError::file_error(
                    path.to_string_lossy(),
                    format!("Failed to inspect list file: {}", e),
                );
                match policy {
                    UnreadablePolicy::Fail => return Err(err),
                    UnreadablePolicy::Skip => {
                        warn!(file = %path.display(), error = %err, "skipping unreadable list file")
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
