//! Training job specification and the managed service's request shape.
//!
//! Pure functions only: no I/O, no async. `TrainingJobSpec::to_request`
//! produces the exact JSON document submitted to the training service.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::TrainingError;
use crate::domain::stack::NetworkOutputs;

/// Job names accepted by the training service.
pub static JOB_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9](-*[a-zA-Z0-9]){0,62}$").expect("valid regex")
});

/// Maximum job name length.
pub const MAX_JOB_NAME_LEN: usize = 63;

/// Name of the single input channel the training script reads from.
pub const TRAINING_CHANNEL: &str = "training";

/// Log level handed to the framework container (Python `logging.INFO`).
const CONTAINER_LOG_LEVEL: u32 = 20;

// ── Status ────────────────────────────────────────────────────────────────────

/// Training job status as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingJobStatus {
    InProgress,
    Completed,
    Failed,
    Stopping,
    Stopped,
    Other(String),
}

impl TrainingJobStatus {
    /// `true` while the service may still move the job to another state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress | Self::Stopping)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for TrainingJobStatus {
    fn from(value: &str) -> Self {
        match value {
            "InProgress" => Self::InProgress,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "Stopping" => Self::Stopping,
            "Stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TrainingJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a training job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingJobDescription {
    pub name: String,
    pub status: TrainingJobStatus,
    /// Finer-grained phase (`Starting`, `Downloading`, `Training`, ...).
    pub secondary_status: Option<String>,
    pub failure_reason: Option<String>,
}

// ── Spec ──────────────────────────────────────────────────────────────────────

/// MPI launch settings for the distributed-training library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpiDistribution {
    /// Worker processes started on each host (usually one per GPU).
    pub processes_per_host: u32,
    /// Extra flags appended to the `mpirun` command line.
    #[serde(default)]
    pub custom_mpi_options: String,
}

/// Everything needed to submit one training job.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingJobSpec {
    pub job_name: String,
    pub image: String,
    pub role_arn: String,
    pub region: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub volume_size_gb: u32,
    pub max_runtime_secs: u64,
    pub entry_point: String,
    /// `s3://` URI of the packaged source directory (`sourcedir.tar.gz`).
    pub submit_dir: String,
    /// `s3://` prefix holding the training data.
    pub training_data: String,
    /// `s3://` prefix the service writes model artifacts under.
    pub output_path: String,
    pub distribution: Option<MpiDistribution>,
    /// Run inside these subnets / security groups when set.
    pub network: Option<NetworkOutputs>,
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
}

impl TrainingJobSpec {
    /// Check the spec against the service's constraints.
    ///
    /// # Errors
    ///
    /// Returns an error listing every violation found.
    pub fn validate(&self) -> Result<()> {
        validate_job_name(&self.job_name)?;

        let mut errors: Vec<String> = Vec::new();
        if self.image.trim().is_empty() {
            errors.push("training image must not be empty".to_string());
        }
        if self.role_arn.trim().is_empty() {
            errors.push("execution role ARN must not be empty".to_string());
        }
        if self.instance_count == 0 {
            errors.push("instance count must be at least 1".to_string());
        }
        if self.distribution.as_ref().is_some_and(|d| d.processes_per_host == 0) {
            errors.push("processes per host must be at least 1".to_string());
        }
        if self.entry_point.trim().is_empty() {
            errors.push("entry point must not be empty".to_string());
        }
        if let Some(network) = &self.network
            && (network.subnets.is_empty() || network.security_groups.is_empty())
        {
            errors.push("VPC config needs at least one subnet and one security group".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TrainingError::InvalidSpec(errors.join("; ")).into())
        }
    }

    /// Hyperparameters as sent to the service: every value JSON-encoded.
    ///
    /// User values are applied first; framework keys always win.
    #[must_use]
    pub fn encoded_hyperparameters(&self) -> BTreeMap<String, String> {
        let mut out: BTreeMap<String, String> = self
            .hyperparameters
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();

        let mut framework = vec![
            ("sagemaker_program", serde_json::json!(self.entry_point)),
            ("sagemaker_submit_directory", serde_json::json!(self.submit_dir)),
            ("sagemaker_region", serde_json::json!(self.region)),
            ("sagemaker_container_log_level", serde_json::json!(CONTAINER_LOG_LEVEL)),
        ];
        if let Some(mpi) = &self.distribution {
            framework.push(("sagemaker_mpi_enabled", serde_json::json!(true)));
            framework.push((
                "sagemaker_mpi_num_of_processes_per_host",
                serde_json::json!(mpi.processes_per_host),
            ));
            framework.push((
                "sagemaker_mpi_custom_mpi_options",
                serde_json::json!(mpi.custom_mpi_options),
            ));
        }
        for (key, value) in framework {
            out.insert(key.to_string(), value.to_string());
        }
        out
    }

    /// Render the CreateTrainingJob request document.
    #[must_use]
    pub fn to_request(&self) -> CreateTrainingJobRequest {
        CreateTrainingJobRequest {
            training_job_name: self.job_name.clone(),
            algorithm_specification: AlgorithmSpecification {
                training_image: self.image.clone(),
                training_input_mode: "File".to_string(),
            },
            role_arn: self.role_arn.clone(),
            input_data_config: vec![Channel {
                channel_name: TRAINING_CHANNEL.to_string(),
                data_source: DataSource {
                    s3_data_source: S3DataSource {
                        s3_data_type: "S3Prefix".to_string(),
                        s3_uri: self.training_data.clone(),
                        s3_data_distribution_type: "FullyReplicated".to_string(),
                    },
                },
            }],
            output_data_config: OutputDataConfig {
                s3_output_path: self.output_path.clone(),
            },
            resource_config: ResourceConfig {
                instance_type: self.instance_type.clone(),
                instance_count: self.instance_count,
                volume_size_in_gb: self.volume_size_gb,
            },
            stopping_condition: StoppingCondition {
                max_runtime_in_seconds: self.max_runtime_secs,
            },
            vpc_config: self.network.as_ref().map(|n| VpcConfig {
                security_group_ids: n.security_groups.clone(),
                subnets: n.subnets.clone(),
            }),
            hyper_parameters: self.encoded_hyperparameters(),
        }
    }
}

// ── Request document ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTrainingJobRequest {
    pub training_job_name: String,
    pub algorithm_specification: AlgorithmSpecification,
    pub role_arn: String,
    pub input_data_config: Vec<Channel>,
    pub output_data_config: OutputDataConfig,
    pub resource_config: ResourceConfig,
    pub stopping_condition: StoppingCondition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
    pub hyper_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlgorithmSpecification {
    pub training_image: String,
    pub training_input_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Channel {
    pub channel_name: String,
    pub data_source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSource {
    pub s3_data_source: S3DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3DataSource {
    pub s3_data_type: String,
    pub s3_uri: String,
    pub s3_data_distribution_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputDataConfig {
    pub s3_output_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceConfig {
    pub instance_type: String,
    pub instance_count: u32,
    #[serde(rename = "VolumeSizeInGB")]
    pub volume_size_in_gb: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoppingCondition {
    pub max_runtime_in_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcConfig {
    pub security_group_ids: Vec<String>,
    pub subnets: Vec<String>,
}

// ── Names ─────────────────────────────────────────────────────────────────────

/// Validates a training job name.
///
/// # Errors
///
/// Returns an error if the name does not match [`JOB_NAME_RE`].
pub fn validate_job_name(name: &str) -> Result<()> {
    if !JOB_NAME_RE.is_match(name) {
        return Err(TrainingError::InvalidJobName(name.to_string()).into());
    }
    Ok(())
}

/// Build a unique job name: `<base>-<YYYY-MM-DD-HH-MM-SS-mmm>`.
///
/// Characters outside `[A-Za-z0-9-]` in `base` become `-`, and `base` is
/// truncated so the whole name fits [`MAX_JOB_NAME_LEN`].
#[must_use]
pub fn job_name_from_base(base: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y-%m-%d-%H-%M-%S-%3f").to_string();
    let room = MAX_JOB_NAME_LEN - timestamp.len() - 1;
    let sanitized: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .take(room)
        .collect();
    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() {
        format!("job-{timestamp}")
    } else {
        format!("{trimmed}-{timestamp}")
    }
}
