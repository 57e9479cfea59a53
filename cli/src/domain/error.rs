//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Errors raised while creating, inspecting, or deleting an infrastructure stack.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to submit stack '{name}': {message}")]
    Submission { name: String, message: String },

    #[error("stack '{name}' already exists and provision.on_existing is 'fail'")]
    AlreadyExists { name: String },

    #[error("stack '{name}' does not exist")]
    NotFound { name: String },

    #[error("stack '{name}' finished in unexpected state {state}{}", reason_suffix(.reason.as_deref()))]
    UnexpectedTerminalState {
        name: String,
        state: String,
        reason: Option<String>,
    },
}

// ── Wait errors ───────────────────────────────────────────────────────────────

/// Errors raised by the polling loop itself rather than by the thing it watches.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out after {}s waiting for {what}", .waited.as_secs())]
    TimedOut { what: String, waited: Duration },

    #[error("cancelled while waiting for {what}")]
    Cancelled { what: String },
}

// ── Training errors ───────────────────────────────────────────────────────────

/// Errors related to training job configuration and outcome.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(
        "Invalid training job name '{0}': must match ^[a-zA-Z0-9](-*[a-zA-Z0-9]){{0,62}}$"
    )]
    InvalidJobName(String),

    #[error("Invalid training job: {0}")]
    InvalidSpec(String),

    #[error("training job '{job}' finished in unexpected state {state}{}", reason_suffix(.reason.as_deref()))]
    UnexpectedTerminalState {
        job: String,
        state: String,
        reason: Option<String>,
    },
}

// ── Dataset errors ────────────────────────────────────────────────────────────

/// Errors related to dataset staging.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("cannot derive a file name from URL '{0}'")]
    NoFileName(String),

    #[error("Invalid S3 URI '{0}': expected s3://<bucket>/<key>")]
    InvalidS3Uri(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("{0} is not configured. Set it with: trainstack config set {0} <value>")]
    Missing(&'static str),
}

fn reason_suffix(reason: Option<&str>) -> String {
    reason.map(|r| format!(" ({r})")).unwrap_or_default()
}
