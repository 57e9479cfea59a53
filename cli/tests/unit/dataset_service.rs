//! Tests for `fetch_dataset` and `upload_dataset`.

use std::cell::RefCell;
use std::path::Path;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use trainstack_cli::application::ports::{DatasetDownloader, FileHasher, ObjectStore};
use trainstack_cli::application::services::dataset::{fetch_dataset, upload_dataset};
use trainstack_cli::domain::dataset::DatasetFile;
use trainstack_cli::domain::{DatasetError, S3Uri, WaitError};
use trainstack_cli::infra::fs::LocalFs;

use crate::helpers::RecordingReporter;

const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

/// Writes a fixed body to the destination and records the URL.
struct WritingDownloader {
    body: &'static [u8],
    urls: RefCell<Vec<String>>,
}

impl WritingDownloader {
    fn new(body: &'static [u8]) -> Self {
        Self {
            body,
            urls: RefCell::new(Vec::new()),
        }
    }
}

impl DatasetDownloader for WritingDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.urls.borrow_mut().push(url.to_string());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, self.body)?;
        Ok(self.body.len() as u64)
    }
}

fn hello_file() -> DatasetFile {
    DatasetFile {
        url: "https://example.com/data/hello.txt".to_string(),
        sha256: Some(HELLO_SHA256.to_string()),
    }
}

#[tokio::test]
async fn fetch_downloads_and_verifies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let downloader = WritingDownloader::new(b"hello");

    let paths = fetch_dataset(
        &downloader,
        &LocalFs,
        &RecordingReporter::default(),
        &[hello_file()],
        dir.path(),
        &CancellationToken::new(),
    )
    .await
    .expect("fetched");

    assert_eq!(paths, vec![dir.path().join("hello.txt")]);
    assert_eq!(downloader.urls.borrow().len(), 1);
}

#[tokio::test]
async fn fetch_skips_files_already_present_with_matching_digest() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("hello.txt"), b"hello").expect("seed");
    let downloader = WritingDownloader::new(b"should not be written");

    fetch_dataset(
        &downloader,
        &LocalFs,
        &RecordingReporter::default(),
        &[hello_file()],
        dir.path(),
        &CancellationToken::new(),
    )
    .await
    .expect("fetched");

    assert!(downloader.urls.borrow().is_empty());
}

#[tokio::test]
async fn fetch_replaces_stale_local_copy() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("hello.txt"), b"stale").expect("seed");
    let downloader = WritingDownloader::new(b"hello");

    fetch_dataset(
        &downloader,
        &LocalFs,
        &RecordingReporter::default(),
        &[hello_file()],
        dir.path(),
        &CancellationToken::new(),
    )
    .await
    .expect("fetched");

    assert_eq!(downloader.urls.borrow().len(), 1);
    assert_eq!(
        LocalFs.sha256_file(&dir.path().join("hello.txt")).expect("hash"),
        HELLO_SHA256
    );
}

#[tokio::test]
async fn fetch_rejects_checksum_mismatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let downloader = WritingDownloader::new(b"tampered");

    let err = fetch_dataset(
        &downloader,
        &LocalFs,
        &RecordingReporter::default(),
        &[hello_file()],
        dir.path(),
        &CancellationToken::new(),
    )
    .await
    .expect_err("digest differs");

    assert!(matches!(
        err.downcast_ref::<DatasetError>(),
        Some(DatasetError::ChecksumMismatch { .. })
    ));
}

#[derive(Default)]
struct SpyStore {
    dirs: RefCell<Vec<String>>,
}

impl ObjectStore for SpyStore {
    async fn upload_file(&self, _: &Path, _: &S3Uri) -> Result<()> {
        anyhow::bail!("upload_file not expected in this test")
    }
    async fn upload_dir(&self, _: &Path, dest: &S3Uri) -> Result<()> {
        self.dirs.borrow_mut().push(dest.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn upload_returns_destination_prefix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SpyStore::default();
    let dest: S3Uri = "s3://bucket/horovod-mnist/data".parse().expect("uri");

    let uri = upload_dataset(
        &store,
        &RecordingReporter::default(),
        dir.path(),
        &dest,
        &CancellationToken::new(),
    )
    .await
        .expect("uploaded");

    assert_eq!(uri, dest);
    assert_eq!(*store.dirs.borrow(), vec!["s3://bucket/horovod-mnist/data"]);
}

#[tokio::test]
async fn upload_requires_local_directory() {
    let store = SpyStore::default();
    let dest = S3Uri::new("bucket", "data");

    let err = upload_dataset(
        &store,
        &RecordingReporter::default(),
        Path::new("/nonexistent/trainstack-data"),
        &dest,
        &CancellationToken::new(),
    )
    .await
    .expect_err("missing dir");

    assert!(err.to_string().contains("data fetch"), "got: {err}");
    assert!(store.dirs.borrow().is_empty());
}

#[tokio::test]
async fn interrupted_fetch_downloads_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let downloader = WritingDownloader::new(b"hello");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fetch_dataset(
        &downloader,
        &LocalFs,
        &RecordingReporter::default(),
        &[hello_file()],
        dir.path(),
        &cancel,
    )
    .await
    .expect_err("cancelled");

    assert!(matches!(
        err.downcast_ref::<WaitError>(),
        Some(WaitError::Cancelled { .. })
    ));
    assert!(downloader.urls.borrow().is_empty());
    assert!(!dir.path().join("hello.txt").exists());
}

#[tokio::test]
async fn interrupted_upload_sends_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SpyStore::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = upload_dataset(
        &store,
        &RecordingReporter::default(),
        dir.path(),
        &S3Uri::new("bucket", "data"),
        &cancel,
    )
    .await
    .expect_err("cancelled");

    assert!(matches!(
        err.downcast_ref::<WaitError>(),
        Some(WaitError::Cancelled { .. })
    ));
    assert!(store.dirs.borrow().is_empty());
}
