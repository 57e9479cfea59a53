//! JSON output helpers.
//!
//! Every `--json` success path prints exactly one pretty-printed object on
//! stdout; failures print the error object from [`format_error`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::application::services::training::LaunchedJob;
use crate::domain::{
    ConfigError, DatasetError, LauncherConfig, NetworkOutputs, ProvisionError, S3Uri,
    TrainingError, TrainingJobDescription, WaitError,
};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable machine-readable code for an error chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<WaitError>() {
        return match e {
            WaitError::TimedOut { .. } => "timeout",
            WaitError::Cancelled { .. } => "cancelled",
        };
    }
    if err.downcast_ref::<ProvisionError>().is_some() {
        "provision"
    } else if err.downcast_ref::<TrainingError>().is_some() {
        "training"
    } else if err.downcast_ref::<DatasetError>().is_some() {
        "dataset"
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "config"
    } else {
        "error"
    }
}

/// Renders command results as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &serde_json::Value) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    pub fn render_network(stack: &str, network: &NetworkOutputs) -> Result<()> {
        Self::print(&json!({
            "stack": stack,
            "subnets": network.subnets,
            "security_groups": network.security_groups,
        }))
    }

    pub fn render_teardown(stack: &str, waited: bool) -> Result<()> {
        Self::print(&json!({
            "stack": stack,
            "status": if waited { "DELETE_COMPLETE" } else { "DELETE_REQUESTED" },
        }))
    }

    pub fn render_dataset(paths: &[PathBuf]) -> Result<()> {
        Self::print(&json!({ "files": paths }))
    }

    pub fn render_upload(uri: &S3Uri) -> Result<()> {
        Self::print(&json!({ "uri": uri.to_string() }))
    }

    pub fn render_clean(dir: &Path, removed: bool) -> Result<()> {
        Self::print(&json!({ "dir": dir, "removed": removed }))
    }

    pub fn render_training(job: &LaunchedJob, last: Option<&TrainingJobDescription>) -> Result<()> {
        Self::print(&json!({
            "job_name": job.name,
            "arn": job.arn,
            "status": last.map(|d| d.status.to_string()),
            "failure_reason": last.and_then(|d| d.failure_reason.clone()),
        }))
    }

    pub fn render_config(config: &LauncherConfig, path: &Path) -> Result<()> {
        Self::print(&json!({ "path": path, "config": config }))
    }

    pub fn render_config_set(key: &str, value: &str) -> Result<()> {
        Self::print(&json!({ "key": key, "value": value }))
    }

    pub fn render_version(version: &str) -> Result<()> {
        Self::print(&json!({ "version": version }))
    }
}
