//! Domain types and validators for trainstack configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::{DatasetFile, default_files};
use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "region",
    "profile",
    "provision.stack_name",
    "provision.template",
    "provision.poll_interval_ms",
    "provision.timeout_secs",
    "provision.on_existing",
    "storage.bucket",
    "storage.prefix",
    "dataset.dir",
    "training.role_arn",
    "training.image",
    "training.instance_type",
    "training.instance_count",
    "training.processes_per_host",
    "training.custom_mpi_options",
    "training.volume_size_gb",
    "training.max_runtime_secs",
    "training.entry_point",
    "training.source_dir",
    "training.job_base_name",
    "training.poll_interval_secs",
];
pub const VALID_ON_EXISTING: &[&str] = &["reuse", "fail"];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.trainstack/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Region passed to every backend call. Falls back to the CLI's own default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Named credentials profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub provision: ProvisionConfig,
    pub storage: StorageConfig,
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
}

/// What to do when the stack name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExisting {
    /// Reuse the existing stack without comparing templates.
    #[default]
    Reuse,
    /// Refuse to continue.
    Fail,
}

impl OnExisting {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reuse => "reuse",
            Self::Fail => "fail",
        }
    }
}

/// Infrastructure stack settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvisionConfig {
    pub stack_name: String,
    /// Template file. The bundled VPC template is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub poll_interval_ms: u64,
    /// Give up waiting after this many seconds. `0` waits forever.
    pub timeout_secs: u64,
    pub on_existing: OnExisting,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            stack_name: "trainstack-vpc".to_string(),
            template: None,
            poll_interval_ms: 500,
            timeout_secs: 1800,
            on_existing: OnExisting::Reuse,
        }
    }
}

impl ProvisionConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `None` when the wait is unbounded.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: "horovod-mnist".to_string(),
        }
    }
}

/// Local dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    pub dir: String,
    pub files: Vec<DatasetFile>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
            files: default_files(),
        }
    }
}

/// Training job settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    /// Framework container image URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub instance_type: String,
    pub instance_count: u32,
    pub processes_per_host: u32,
    pub custom_mpi_options: String,
    pub volume_size_gb: u32,
    pub max_runtime_secs: u64,
    pub entry_point: String,
    pub source_dir: String,
    pub job_base_name: String,
    pub poll_interval_secs: u64,
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            role_arn: None,
            image: None,
            instance_type: "ml.p3.2xlarge".to_string(),
            instance_count: 2,
            processes_per_host: 1,
            custom_mpi_options: "-verbose --NCCL_DEBUG=INFO".to_string(),
            volume_size_gb: 30,
            max_runtime_secs: 86_400,
            entry_point: "train_hvd.py".to_string(),
            source_dir: ".".to_string(),
            job_base_name: "horovod-mnist".to_string(),
            poll_interval_secs: 30,
            hyperparameters: BTreeMap::new(),
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |valid: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid: valid.to_string(),
    };
    match key {
        "provision.on_existing" if !VALID_ON_EXISTING.contains(&value) => {
            Err(invalid(&VALID_ON_EXISTING.join(", ")).into())
        }
        "provision.poll_interval_ms"
        | "training.instance_count"
        | "training.processes_per_host"
        | "training.volume_size_gb"
            if value.parse::<u32>().map_or(true, |n| n == 0) =>
        {
            Err(invalid("a positive integer").into())
        }
        "training.max_runtime_secs" | "training.poll_interval_secs"
            if value.parse::<u64>().map_or(true, |n| n == 0) =>
        {
            Err(invalid("a positive number of seconds").into())
        }
        "provision.timeout_secs" if value.parse::<u64>().is_err() => {
            Err(invalid("a non-negative integer (0 waits forever)").into())
        }
        "storage.bucket"
        | "provision.stack_name"
        | "training.role_arn"
        | "training.image"
        | "training.job_base_name"
            if value.trim().is_empty() =>
        {
            Err(invalid("a non-empty string").into())
        }
        _ => Ok(()),
    }
}

/// Apply a validated `key = value` assignment to `config`.
///
/// # Errors
///
/// Returns an error if the key or value is invalid.
pub fn apply_config_value(config: &mut LauncherConfig, key: &str, value: &str) -> Result<()> {
    validate_config_key(key)?;
    validate_config_value(key, value)?;

    let owned = value.to_string();
    match key {
        "region" => config.region = Some(owned),
        "profile" => config.profile = Some(owned),
        "provision.stack_name" => config.provision.stack_name = owned,
        "provision.template" => config.provision.template = Some(owned),
        "provision.poll_interval_ms" => config.provision.poll_interval_ms = value.parse()?,
        "provision.timeout_secs" => config.provision.timeout_secs = value.parse()?,
        "provision.on_existing" => {
            config.provision.on_existing = if value == "fail" {
                OnExisting::Fail
            } else {
                OnExisting::Reuse
            };
        }
        "storage.bucket" => config.storage.bucket = Some(owned),
        "storage.prefix" => config.storage.prefix = owned,
        "dataset.dir" => config.dataset.dir = owned,
        "training.role_arn" => config.training.role_arn = Some(owned),
        "training.image" => config.training.image = Some(owned),
        "training.instance_type" => config.training.instance_type = owned,
        "training.instance_count" => config.training.instance_count = value.parse()?,
        "training.processes_per_host" => config.training.processes_per_host = value.parse()?,
        "training.custom_mpi_options" => config.training.custom_mpi_options = owned,
        "training.volume_size_gb" => config.training.volume_size_gb = value.parse()?,
        "training.max_runtime_secs" => config.training.max_runtime_secs = value.parse()?,
        "training.entry_point" => config.training.entry_point = owned,
        "training.source_dir" => config.training.source_dir = owned,
        "training.job_base_name" => config.training.job_base_name = owned,
        "training.poll_interval_secs" => config.training.poll_interval_secs = value.parse()?,
        _ => anyhow::bail!("Unknown setting: {key}"),
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
