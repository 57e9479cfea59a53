//! Dataset file descriptors.

use serde::{Deserialize, Serialize};

use crate::domain::error::DatasetError;

/// Keras-hosted MNIST archive used by the distributed training example.
pub const MNIST_URL: &str = "https://storage.googleapis.com/tensorflow/tf-keras-datasets/mnist.npz";
/// Published SHA-256 of [`MNIST_URL`].
pub const MNIST_SHA256: &str = "731c5ac602752760c8e48fbffcf8c3b850d9dc2a2aedcf2cc48468fc17b673d1";

/// A file to download into the local dataset directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub url: String,
    /// Expected lowercase hex SHA-256. Unchecked when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl DatasetFile {
    /// The local file name: last path segment of the URL, without query string.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL has no usable final segment.
    pub fn file_name(&self) -> Result<&str, DatasetError> {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        match path.rsplit('/').next() {
            Some(name) if !name.is_empty() && path.contains('/') => Ok(name),
            _ => Err(DatasetError::NoFileName(self.url.clone())),
        }
    }

    /// Whether `actual` satisfies the expected digest (always true when unset).
    #[must_use]
    pub fn matches_digest(&self, actual: &str) -> bool {
        self.sha256
            .as_deref()
            .is_none_or(|expected| expected.eq_ignore_ascii_case(actual))
    }
}

/// The default dataset: the MNIST archive.
#[must_use]
pub fn default_files() -> Vec<DatasetFile> {
    vec![DatasetFile {
        url: MNIST_URL.to_string(),
        sha256: Some(MNIST_SHA256.to_string()),
    }]
}

/// Encode bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}
