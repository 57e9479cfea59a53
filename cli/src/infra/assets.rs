//! Assets compiled into the binary.

use std::path::Path;

use anyhow::{Context, Result};

/// Default stack template: a two-subnet VPC with an S3 endpoint and a
/// self-referencing security group.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../assets/vpc-template.yaml");

/// Read the template at `path`, or return [`DEFAULT_TEMPLATE`] when unset.
///
/// # Errors
///
/// Returns an error if `path` is set but cannot be read.
pub fn load_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("cannot read template {}", p.display())),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}
