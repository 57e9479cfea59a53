//! Training job launch and monitoring.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ObjectStore, ProgressReporter, SourceArchiver, TrainingService};
use crate::application::services::waiter::{
    WaitPolicy, ensure_not_cancelled, poll_until, until_cancelled,
};
use crate::domain::{
    S3Uri, TrainingError, TrainingJobDescription, TrainingJobSpec, TrainingJobStatus,
};

/// A submitted training job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedJob {
    pub name: String,
    pub arn: String,
}

/// Package `source_dir`, upload it to `spec.submit_dir`, and submit the job.
///
/// The job is validated before anything is uploaded. The tarball is
/// written into `staging_dir`, which the caller owns. Nothing is submitted
/// once `cancel` has fired.
///
/// # Errors
///
/// Returns an error if the job is invalid, packaging or upload fails, the
/// service rejects the job, or `cancel` fires before submission.
#[allow(clippy::too_many_arguments)]
pub async fn launch_training(
    archiver: &impl SourceArchiver,
    store: &impl ObjectStore,
    service: &impl TrainingService,
    reporter: &impl ProgressReporter,
    spec: &TrainingJobSpec,
    source_dir: &Path,
    staging_dir: &Path,
    cancel: &CancellationToken,
) -> Result<LaunchedJob> {
    spec.validate()?;
    let submit_uri: S3Uri = spec.submit_dir.parse()?;
    let what = format!("launch of training job '{}'", spec.job_name);

    ensure_not_cancelled(cancel, &what)?;
    reporter.step(&format!("packaging {}...", source_dir.display()));
    let tarball = archiver
        .archive_dir(source_dir, staging_dir)
        .with_context(|| format!("packaging {}", source_dir.display()))?;

    reporter.step(&format!("uploading source to {submit_uri}..."));
    until_cancelled(&what, cancel, async {
        store
            .upload_file(&tarball, &submit_uri)
            .await
            .context("uploading training source")
    })
    .await?;

    ensure_not_cancelled(cancel, &what)?;
    reporter.step(&format!("submitting training job {}...", spec.job_name));
    let arn = service
        .create_training_job(&spec.to_request())
        .await
        .with_context(|| format!("submitting training job {}", spec.job_name))?;
    tracing::info!(job = %spec.job_name, %arn, "training job submitted");
    reporter.success(&format!("training job {} submitted", spec.job_name));

    Ok(LaunchedJob {
        name: spec.job_name.clone(),
        arn,
    })
}

/// Poll a training job until it leaves `InProgress` / `Stopping`.
///
/// # Errors
///
/// Returns an error on timeout or cancellation, if a describe call fails, or
/// if the job ends in any state other than `Completed`.
pub async fn wait_for_training_job(
    service: &impl TrainingService,
    reporter: &impl ProgressReporter,
    name: &str,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> Result<TrainingJobDescription> {
    reporter.step(&format!("waiting for training job {name}..."));
    let mut last_phase: Option<String> = None;
    let description = poll_until(
        &format!("training job '{name}'"),
        policy,
        cancel,
        || service.describe_training_job(name),
        |d: &TrainingJobDescription| {
            if d.secondary_status != last_phase {
                if let Some(phase) = &d.secondary_status {
                    reporter.step(&format!("training job {name}: {phase}"));
                }
                last_phase.clone_from(&d.secondary_status);
            }
            !d.status.is_active()
        },
    )
    .await?;

    if description.status != TrainingJobStatus::Completed {
        return Err(TrainingError::UnexpectedTerminalState {
            job: description.name,
            state: description.status.to_string(),
            reason: description.failure_reason,
        }
        .into());
    }
    reporter.success(&format!("training job {name} completed"));
    Ok(description)
}
