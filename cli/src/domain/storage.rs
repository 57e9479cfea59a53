//! Object storage locations.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::DatasetError;

/// An `s3://bucket/key` location. `key` never starts or ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Uri {
    pub bucket: String,
    pub key: String,
}

impl S3Uri {
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: &str) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.trim_matches('/').to_string(),
        }
    }

    /// Append path segments to the key.
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        let key = match (self.key.is_empty(), segment.is_empty()) {
            (true, _) => segment.to_string(),
            (false, true) => self.key.clone(),
            (false, false) => format!("{}/{segment}", self.key),
        };
        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }
}

impl FromStr for S3Uri {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("s3://")
            .ok_or_else(|| DatasetError::InvalidS3Uri(s.to_string()))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(DatasetError::InvalidS3Uri(s.to_string()));
        }
        Ok(Self::new(bucket, key))
    }
}

impl fmt::Display for S3Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "s3://{}", self.bucket)
        } else {
            write!(f, "s3://{}/{}", self.bucket, self.key)
        }
    }
}
