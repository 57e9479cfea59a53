//! HTTP download adapter for dataset files.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::application::ports::DatasetDownloader;
use crate::domain::WaitError;

const USER_AGENT: &str = concat!("trainstack/", env!("CARGO_PKG_VERSION"));

/// Blocking `ureq` downloader run on tokio's blocking pool.
///
/// Data is streamed to `<dest>.part` and renamed into place once complete,
/// so an interrupted download never leaves a truncated `dest` behind. The
/// blocking task checks `cancel` between chunks and stops once it fires.
pub struct UreqDownloader {
    quiet: bool,
    cancel: CancellationToken,
}

impl UreqDownloader {
    #[must_use]
    pub fn new(quiet: bool, cancel: CancellationToken) -> Self {
        Self { quiet, cancel }
    }
}

impl DatasetDownloader for UreqDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let url = url.to_string();
        let dest = dest.to_path_buf();
        let quiet = self.quiet;
        let cancel = self.cancel.clone();
        tokio::task::spawn_blocking(move || download_blocking(&url, &dest, quiet, &cancel))
            .await
            .context("download task panicked")?
    }
}

fn cancelled(url: &str) -> anyhow::Error {
    WaitError::Cancelled {
        what: format!("download of {url}"),
    }
    .into()
}

fn download_blocking(
    url: &str,
    dest: &Path,
    quiet: bool,
    cancel: &CancellationToken,
) -> Result<u64> {
    if cancel.is_cancelled() {
        return Err(cancelled(url));
    }
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let response = match ureq::get(url).set("User-Agent", USER_AGENT).call() {
        Ok(r) => r,
        Err(ureq::Error::Status(code, _)) => anyhow::bail!("download failed: HTTP {code}"),
        Err(e) => return Err(e).context("download failed"),
    };
    let total = response
        .header("Content-Length")
        .and_then(|v| v.parse::<u64>().ok());

    let partial = partial_path(dest);
    let mut file =
        File::create(&partial).with_context(|| format!("creating {}", partial.display()))?;
    let pb = progress_bar(quiet, total);

    let mut reader = response.into_reader();
    let mut buf = vec![0u8; 64 * 1024];
    let mut written: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            pb.finish_and_clear();
            drop(file);
            if let Err(e) = std::fs::remove_file(&partial) {
                tracing::debug!(path = %partial.display(), error = %e, "leaving partial download");
            }
            return Err(cancelled(url));
        }
        let n = reader.read(&mut buf).context("download interrupted")?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).context("download interrupted")?;
        written += n as u64;
        pb.inc(n as u64);
    }
    pb.finish_and_clear();
    drop(file);

    std::fs::rename(&partial, dest)
        .with_context(|| format!("moving download into {}", dest.display()))?;
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

fn progress_bar(quiet: bool, total: Option<u64>) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = total.map_or_else(ProgressBar::new_spinner, ProgressBar::new);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.cyan} {bytes}/{total_bytes} [{bar:30}] {bytes_per_sec}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
