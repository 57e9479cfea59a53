//! Filesystem infrastructure: hashing, source packaging, dataset cleanup.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};

use crate::application::ports::{FileHasher, SourceArchiver};
use crate::domain::dataset::hex_encode;

/// Name of the packaged source archive the framework container expects.
pub const SOURCE_ARCHIVE_NAME: &str = "sourcedir.tar.gz";

/// Entries never packaged with the training source.
const SKIPPED_ENTRIES: &[&str] = &[".git", "target", "__pycache__"];

/// Production filesystem adapter.
pub struct LocalFs;

impl FileHasher for LocalFs {
    fn sha256_file(&self, path: &Path) -> Result<String> {
        sha256_file(path)
    }
}

impl SourceArchiver for LocalFs {
    fn archive_dir(&self, dir: &Path, out_dir: &Path) -> Result<PathBuf> {
        archive_dir(dir, out_dir)
    }
}

/// Compute the SHA256 hex digest of a file.
///
/// Reads the file in 64 KB chunks to avoid loading large files into memory.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    loop {
        let n = file.read(&mut buf).context("reading file")?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

/// Pack the contents of `dir` (not `dir` itself) into
/// `out_dir/sourcedir.tar.gz`, so the entry point sits at the archive root.
///
/// # Errors
///
/// Returns an error if `dir` cannot be read or the archive cannot be written.
pub fn archive_dir(dir: &Path, out_dir: &Path) -> Result<PathBuf> {
    let out = out_dir.join(SOURCE_ARCHIVE_NAME);
    let file = File::create(&out).with_context(|| format!("creating {}", out.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(true);

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("reading {}", dir.display()))?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name();
        if SKIPPED_ENTRIES.iter().any(|s| name == *s) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            builder
                .append_dir_all(&name, &path)
                .with_context(|| format!("archiving {}", path.display()))?;
        } else {
            builder
                .append_path_with_name(&path, &name)
                .with_context(|| format!("archiving {}", path.display()))?;
        }
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .with_context(|| format!("finishing {}", out.display()))?;
    tracing::debug!(archive = %out.display(), "source packaged");
    Ok(out)
}

/// Remove a local dataset directory. Returns `false` if it did not exist.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(path).with_context(|| format!("removing {}", path.display()))?;
    Ok(true)
}
