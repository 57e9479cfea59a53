//! Dataset staging: download into a local directory, upload to object storage.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{DatasetDownloader, FileHasher, ObjectStore, ProgressReporter};
use crate::application::services::waiter::{ensure_not_cancelled, until_cancelled};
use crate::domain::dataset::DatasetFile;
use crate::domain::{DatasetError, S3Uri};

/// Download every file into `dir`, skipping files already present with a
/// matching digest. Returns the local paths in input order.
///
/// `cancel` is checked before each file and abandons a download in flight.
///
/// # Errors
///
/// Returns an error if a URL has no file name, a download fails, a
/// downloaded file does not match its expected SHA-256, or `cancel` fires.
pub async fn fetch_dataset(
    downloader: &impl DatasetDownloader,
    hasher: &impl FileHasher,
    reporter: &impl ProgressReporter,
    files: &[DatasetFile],
    dir: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let name = file.file_name()?;
        let what = format!("download of {name}");
        ensure_not_cancelled(cancel, &what)?;
        let dest = dir.join(name);

        if dest.exists() && file.sha256.is_some() {
            let digest = hasher.sha256_file(&dest)?;
            if file.matches_digest(&digest) {
                tracing::debug!(file = name, "already present, skipping download");
                reporter.success(&format!("{name} already downloaded"));
                paths.push(dest);
                continue;
            }
            tracing::warn!(file = name, "local copy has a different digest, downloading again");
        }

        reporter.step(&format!("downloading {name}..."));
        let bytes = until_cancelled(&what, cancel, async {
            downloader
                .download(&file.url, &dest)
                .await
                .with_context(|| format!("downloading {}", file.url))
        })
        .await?;

        let digest = hasher.sha256_file(&dest)?;
        if !file.matches_digest(&digest) {
            return Err(DatasetError::ChecksumMismatch {
                file: name.to_string(),
                expected: file.sha256.clone().unwrap_or_default(),
                actual: digest,
            }
            .into());
        }
        tracing::info!(file = name, bytes, "downloaded");
        reporter.success(&format!("downloaded {name} ({bytes} bytes)"));
        paths.push(dest);
    }
    Ok(paths)
}

/// Upload the local dataset directory under `dest` and return the prefix to
/// use as the training channel.
///
/// # Errors
///
/// Returns an error if `dir` does not exist, the upload fails, or `cancel`
/// fires first.
pub async fn upload_dataset(
    store: &impl ObjectStore,
    reporter: &impl ProgressReporter,
    dir: &Path,
    dest: &S3Uri,
    cancel: &CancellationToken,
) -> Result<S3Uri> {
    anyhow::ensure!(
        dir.is_dir(),
        "dataset directory {} does not exist. Run 'trainstack data fetch' first.",
        dir.display()
    );
    reporter.step(&format!("uploading {} to {dest}...", dir.display()));
    until_cancelled(&format!("upload to {dest}"), cancel, async {
        store
            .upload_dir(dir, dest)
            .await
            .with_context(|| format!("uploading dataset to {dest}"))
    })
    .await?;
    reporter.success(&format!("dataset uploaded to {dest}"));
    Ok(dest.clone())
}
