//! Infrastructure implementation of the cloud port traits.
//!
//! `AwsCli<R>` routes every call through the `aws` command line via a
//! `CommandRunner`, requesting JSON output and parsing it with serde.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::{CommandRunner, ObjectStore, StackBackend, TrainingService};
use crate::domain::{
    CreateOutcome, CreateTrainingJobRequest, ProvisionError, S3Uri, StackDescription,
    StackOutput, StackStatus, TrainingJobDescription, TrainingJobStatus,
};
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner, UPLOAD_TIMEOUT};

const AWS: &str = "aws";

/// Cloud adapter backed by the `aws` CLI.
///
/// Generic over `R: CommandRunner` so tests can inject a scripted runner.
pub struct AwsCli<R: CommandRunner> {
    runner: R,
    region: Option<String>,
    profile: Option<String>,
}

impl<R: CommandRunner> AwsCli<R> {
    pub fn new(runner: R, region: Option<String>, profile: Option<String>) -> Self {
        Self {
            runner,
            region,
            profile,
        }
    }

    /// Full argument list: the operation's own arguments followed by the
    /// global output, region, and profile flags.
    #[must_use]
    pub fn args<'a>(&'a self, op: &[&'a str]) -> Vec<&'a str> {
        let mut args = op.to_vec();
        args.extend(["--output", "json"]);
        if let Some(region) = &self.region {
            args.extend(["--region", region.as_str()]);
        }
        if let Some(profile) = &self.profile {
            args.extend(["--profile", profile.as_str()]);
        }
        args
    }

    async fn call(&self, op: &[&str], timeout: Option<Duration>) -> Result<Output> {
        let args = self.args(op);
        let output = match timeout {
            Some(t) => self.runner.run_with_timeout(AWS, &args, t).await,
            None => self.runner.run(AWS, &args).await,
        };
        output.with_context(|| format!("aws {}", op[..op.len().min(2)].join(" ")))
    }
}

impl AwsCli<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner(region: Option<String>, profile: Option<String>) -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT), region, profile)
    }
}

// ── Response shapes ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateStackResponse {
    stack_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksResponse {
    #[serde(default)]
    stacks: Vec<StackRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackRecord {
    stack_name: String,
    stack_status: String,
    #[serde(default)]
    stack_status_reason: Option<String>,
    #[serde(default)]
    outputs: Vec<StackOutput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateTrainingJobResponse {
    training_job_arn: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrainingJobRecord {
    training_job_name: String,
    training_job_status: String,
    #[serde(default)]
    secondary_status: Option<String>,
    #[serde(default)]
    failure_reason: Option<String>,
}

// ── Parsing helpers ──────────────────────────────────────────────────────────

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// `true` when the CLI reported a name collision.
#[must_use]
pub fn is_already_exists(stderr: &str) -> bool {
    stderr.contains("AlreadyExistsException")
}

/// `true` when the CLI reported that the named stack is missing.
#[must_use]
pub fn is_missing_stack(stderr: &str) -> bool {
    stderr.contains("does not exist")
}

/// Parse `describe-stacks` JSON for the stack called `name`.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or lists no stacks.
pub fn parse_stack_description(name: &str, stdout: &[u8]) -> Result<StackDescription> {
    let response: DescribeStacksResponse =
        serde_json::from_slice(stdout).context("parsing describe-stacks output")?;
    let record = response
        .stacks
        .into_iter()
        .next()
        .ok_or_else(|| ProvisionError::NotFound {
            name: name.to_string(),
        })?;
    Ok(StackDescription {
        name: record.stack_name,
        status: StackStatus::from(record.stack_status.as_str()),
        status_reason: record.stack_status_reason,
        outputs: record.outputs,
    })
}

/// Parse `describe-training-job` JSON.
///
/// # Errors
///
/// Returns an error if the JSON is malformed.
pub fn parse_training_job(stdout: &[u8]) -> Result<TrainingJobDescription> {
    let record: TrainingJobRecord =
        serde_json::from_slice(stdout).context("parsing describe-training-job output")?;
    Ok(TrainingJobDescription {
        name: record.training_job_name,
        status: TrainingJobStatus::from(record.training_job_status.as_str()),
        secondary_status: record.secondary_status,
        failure_reason: record.failure_reason,
    })
}

// ── Port implementations ─────────────────────────────────────────────────────

impl<R: CommandRunner> StackBackend for AwsCli<R> {
    async fn create_stack(&self, name: &str, template_body: &str) -> Result<CreateOutcome> {
        let output = self
            .call(
                &[
                    "cloudformation",
                    "create-stack",
                    "--stack-name",
                    name,
                    "--template-body",
                    template_body,
                ],
                None,
            )
            .await?;
        if !output.status.success() {
            let stderr = stderr_of(&output);
            if is_already_exists(&stderr) {
                return Ok(CreateOutcome::AlreadyExists);
            }
            anyhow::bail!("create-stack failed: {stderr}");
        }
        let response: CreateStackResponse =
            serde_json::from_slice(&output.stdout).context("parsing create-stack output")?;
        Ok(CreateOutcome::Created {
            stack_id: response.stack_id,
        })
    }

    async fn describe_stack(&self, name: &str) -> Result<StackDescription> {
        let output = self
            .call(
                &["cloudformation", "describe-stacks", "--stack-name", name],
                None,
            )
            .await?;
        if !output.status.success() {
            let stderr = stderr_of(&output);
            if is_missing_stack(&stderr) {
                return Err(ProvisionError::NotFound {
                    name: name.to_string(),
                }
                .into());
            }
            anyhow::bail!("describe-stacks failed: {stderr}");
        }
        parse_stack_description(name, &output.stdout)
    }

    async fn delete_stack(&self, name: &str) -> Result<()> {
        let output = self
            .call(
                &["cloudformation", "delete-stack", "--stack-name", name],
                None,
            )
            .await?;
        if !output.status.success() {
            anyhow::bail!("delete-stack failed: {}", stderr_of(&output));
        }
        Ok(())
    }
}

impl<R: CommandRunner> ObjectStore for AwsCli<R> {
    async fn upload_file(&self, local: &Path, dest: &S3Uri) -> Result<()> {
        let local = local.to_string_lossy();
        let dest = dest.to_string();
        let output = self
            .call(
                &["s3", "cp", &local, &dest, "--only-show-errors"],
                Some(UPLOAD_TIMEOUT),
            )
            .await?;
        if !output.status.success() {
            anyhow::bail!("upload to {dest} failed: {}", stderr_of(&output));
        }
        Ok(())
    }

    async fn upload_dir(&self, local: &Path, dest: &S3Uri) -> Result<()> {
        let local = local.to_string_lossy();
        let dest = dest.to_string();
        let output = self
            .call(
                &["s3", "cp", "--recursive", &local, &dest, "--only-show-errors"],
                Some(UPLOAD_TIMEOUT),
            )
            .await?;
        if !output.status.success() {
            anyhow::bail!("upload to {dest} failed: {}", stderr_of(&output));
        }
        Ok(())
    }
}

impl<R: CommandRunner> TrainingService for AwsCli<R> {
    async fn create_training_job(&self, request: &CreateTrainingJobRequest) -> Result<String> {
        let body = serde_json::to_string(request).context("serializing training job request")?;
        let output = self
            .call(
                &["sagemaker", "create-training-job", "--cli-input-json", &body],
                None,
            )
            .await?;
        if !output.status.success() {
            anyhow::bail!("create-training-job failed: {}", stderr_of(&output));
        }
        let response: CreateTrainingJobResponse = serde_json::from_slice(&output.stdout)
            .context("parsing create-training-job output")?;
        Ok(response.training_job_arn)
    }

    async fn describe_training_job(&self, name: &str) -> Result<TrainingJobDescription> {
        let output = self
            .call(
                &["sagemaker", "describe-training-job", "--training-job-name", name],
                None,
            )
            .await?;
        if !output.status.success() {
            anyhow::bail!("describe-training-job failed: {}", stderr_of(&output));
        }
        parse_training_job(&output.stdout)
    }
}
