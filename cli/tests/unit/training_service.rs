//! Tests for `launch_training` and `wait_for_training_job`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use trainstack_cli::application::WaitPolicy;
use trainstack_cli::application::ports::{ObjectStore, SourceArchiver, TrainingService};
use trainstack_cli::application::services::training::{launch_training, wait_for_training_job};
use trainstack_cli::domain::{
    CreateTrainingJobRequest, MpiDistribution, NetworkOutputs, S3Uri, TrainingError,
    TrainingJobDescription, TrainingJobSpec, TrainingJobStatus, WaitError,
};

use crate::helpers::RecordingReporter;

pub fn spec() -> TrainingJobSpec {
    TrainingJobSpec {
        job_name: "hvd-1".to_string(),
        image: "763104351884.dkr.ecr.us-west-2.amazonaws.com/tensorflow-training:2.13-gpu-py310"
            .to_string(),
        role_arn: "arn:aws:iam::123456789012:role/SageMakerRole".to_string(),
        region: "us-west-2".to_string(),
        instance_type: "ml.p3.2xlarge".to_string(),
        instance_count: 2,
        volume_size_gb: 30,
        max_runtime_secs: 86_400,
        entry_point: "train_hvd.py".to_string(),
        submit_dir: "s3://bucket/horovod-mnist/hvd-1/source/sourcedir.tar.gz".to_string(),
        training_data: "s3://bucket/horovod-mnist/data".to_string(),
        output_path: "s3://bucket/horovod-mnist/output".to_string(),
        distribution: Some(MpiDistribution {
            processes_per_host: 1,
            custom_mpi_options: "-verbose --NCCL_DEBUG=INFO".to_string(),
        }),
        network: Some(NetworkOutputs {
            subnets: vec!["subnet-aaa".to_string(), "subnet-bbb".to_string()],
            security_groups: vec!["sg-111".to_string()],
        }),
        hyperparameters: BTreeMap::new(),
    }
}

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FixedArchiver;

impl SourceArchiver for FixedArchiver {
    fn archive_dir(&self, _dir: &Path, out_dir: &Path) -> Result<PathBuf> {
        Ok(out_dir.join("sourcedir.tar.gz"))
    }
}

#[derive(Default)]
struct SpyStore {
    files: RefCell<Vec<(PathBuf, String)>>,
}

impl ObjectStore for SpyStore {
    async fn upload_file(&self, local: &Path, dest: &S3Uri) -> Result<()> {
        self.files
            .borrow_mut()
            .push((local.to_path_buf(), dest.to_string()));
        Ok(())
    }
    async fn upload_dir(&self, _: &Path, _: &S3Uri) -> Result<()> {
        anyhow::bail!("upload_dir not expected in this test")
    }
}

struct ScriptedTraining {
    submitted: RefCell<Option<CreateTrainingJobRequest>>,
    script: RefCell<VecDeque<(&'static str, Option<&'static str>, Option<&'static str>)>>,
    describe_calls: Cell<u32>,
}

impl ScriptedTraining {
    fn new(script: &[(&'static str, Option<&'static str>, Option<&'static str>)]) -> Self {
        Self {
            submitted: RefCell::new(None),
            script: RefCell::new(script.iter().copied().collect()),
            describe_calls: Cell::new(0),
        }
    }
}

impl TrainingService for ScriptedTraining {
    async fn create_training_job(&self, request: &CreateTrainingJobRequest) -> Result<String> {
        *self.submitted.borrow_mut() = Some(request.clone());
        Ok(format!(
            "arn:aws:sagemaker:us-west-2:123456789012:training-job/{}",
            request.training_job_name
        ))
    }

    async fn describe_training_job(&self, name: &str) -> Result<TrainingJobDescription> {
        self.describe_calls.set(self.describe_calls.get() + 1);
        let (status, phase, reason) = self
            .script
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("describe not expected: script exhausted"))?;
        Ok(TrainingJobDescription {
            name: name.to_string(),
            status: TrainingJobStatus::from(status),
            secondary_status: phase.map(str::to_string),
            failure_reason: reason.map(str::to_string),
        })
    }
}

// ── launch_training ──────────────────────────────────────────────────────────

#[tokio::test]
async fn launch_uploads_source_then_submits() {
    let store = SpyStore::default();
    let service = ScriptedTraining::new(&[]);
    let staging = Path::new("/tmp/staging");

    let job = launch_training(
        &FixedArchiver,
        &store,
        &service,
        &RecordingReporter::default(),
        &spec(),
        Path::new("."),
        staging,
        &CancellationToken::new(),
    )
    .await
    .expect("launched");

    assert_eq!(job.name, "hvd-1");
    assert!(job.arn.ends_with("training-job/hvd-1"));
    assert_eq!(
        *store.files.borrow(),
        vec![(
            staging.join("sourcedir.tar.gz"),
            "s3://bucket/horovod-mnist/hvd-1/source/sourcedir.tar.gz".to_string()
        )]
    );
    let submitted = service.submitted.borrow().clone().expect("submitted");
    assert_eq!(submitted.hyper_parameters["sagemaker_mpi_enabled"], "true");
    assert_eq!(
        submitted.vpc_config.expect("vpc").subnets,
        vec!["subnet-aaa", "subnet-bbb"]
    );
}

#[tokio::test]
async fn invalid_spec_is_rejected_before_upload() {
    let store = SpyStore::default();
    let service = ScriptedTraining::new(&[]);
    let mut bad = spec();
    bad.job_name = "bad_name".to_string();

    let err = launch_training(
        &FixedArchiver,
        &store,
        &service,
        &RecordingReporter::default(),
        &bad,
        Path::new("."),
        Path::new("/tmp"),
        &CancellationToken::new(),
    )
    .await
    .expect_err("invalid name");

    assert!(matches!(
        err.downcast_ref::<TrainingError>(),
        Some(TrainingError::InvalidJobName(_))
    ));
    assert!(store.files.borrow().is_empty());
    assert!(service.submitted.borrow().is_none());
}

#[tokio::test]
async fn interrupted_launch_submits_nothing() {
    let store = SpyStore::default();
    let service = ScriptedTraining::new(&[]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = launch_training(
        &FixedArchiver,
        &store,
        &service,
        &RecordingReporter::default(),
        &spec(),
        Path::new("."),
        Path::new("/tmp"),
        &cancel,
    )
    .await
    .expect_err("cancelled");

    assert!(matches!(
        err.downcast_ref::<WaitError>(),
        Some(WaitError::Cancelled { .. })
    ));
    assert!(store.files.borrow().is_empty());
    assert!(service.submitted.borrow().is_none());
}

/// Cancels the token while the source upload is running.
struct CancellingStore {
    cancel: CancellationToken,
    uploads: Cell<u32>,
}

impl ObjectStore for CancellingStore {
    async fn upload_file(&self, _: &Path, _: &S3Uri) -> Result<()> {
        self.uploads.set(self.uploads.get() + 1);
        self.cancel.cancel();
        Ok(())
    }
    async fn upload_dir(&self, _: &Path, _: &S3Uri) -> Result<()> {
        anyhow::bail!("upload_dir not expected in this test")
    }
}

#[tokio::test]
async fn interrupt_during_upload_prevents_submission() {
    let cancel = CancellationToken::new();
    let store = CancellingStore {
        cancel: cancel.clone(),
        uploads: Cell::new(0),
    };
    let service = ScriptedTraining::new(&[]);

    let err = launch_training(
        &FixedArchiver,
        &store,
        &service,
        &RecordingReporter::default(),
        &spec(),
        Path::new("."),
        Path::new("/tmp"),
        &cancel,
    )
    .await
    .expect_err("cancelled");

    assert!(matches!(
        err.downcast_ref::<WaitError>(),
        Some(WaitError::Cancelled { .. })
    ));
    assert_eq!(store.uploads.get(), 1);
    assert!(service.submitted.borrow().is_none());
}

// ── wait_for_training_job ────────────────────────────────────────────────────

const INTERVAL: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn wait_polls_until_completed_and_reports_phases() {
    let service = ScriptedTraining::new(&[
        ("InProgress", Some("Starting"), None),
        ("InProgress", Some("Training"), None),
        ("InProgress", Some("Training"), None),
        ("Completed", Some("Completed"), None),
    ]);
    let reporter = RecordingReporter::default();
    let start = Instant::now();

    let d = wait_for_training_job(
        &service,
        &reporter,
        "hvd-1",
        &WaitPolicy::new(INTERVAL, None),
        &CancellationToken::new(),
    )
    .await
    .expect("completed");

    assert_eq!(d.status, TrainingJobStatus::Completed);
    assert_eq!(service.describe_calls.get(), 4);
    assert_eq!(start.elapsed(), 3 * INTERVAL);
    let phases: Vec<String> = reporter
        .events
        .borrow()
        .iter()
        .filter(|e| e.starts_with("step: training job hvd-1: "))
        .cloned()
        .collect();
    assert_eq!(phases.len(), 3, "each phase reported once, got: {phases:?}");
}

#[tokio::test(start_paused = true)]
async fn failed_job_error_carries_failure_reason() {
    let service = ScriptedTraining::new(&[
        ("InProgress", Some("Training"), None),
        ("Failed", Some("Failed"), Some("AlgorithmError: mpirun exited with code 1")),
    ]);

    let err = wait_for_training_job(
        &service,
        &RecordingReporter::default(),
        "hvd-1",
        &WaitPolicy::new(INTERVAL, None),
        &CancellationToken::new(),
    )
    .await
    .expect_err("job failed");

    let msg = err.to_string();
    assert!(msg.contains("Failed"), "got: {msg}");
    assert!(msg.contains("mpirun exited with code 1"), "got: {msg}");
}

#[tokio::test(start_paused = true)]
async fn stopping_keeps_polling_until_stopped() {
    let service = ScriptedTraining::new(&[
        ("Stopping", None, None),
        ("Stopped", None, None),
    ]);

    let err = wait_for_training_job(
        &service,
        &RecordingReporter::default(),
        "hvd-1",
        &WaitPolicy::new(INTERVAL, None),
        &CancellationToken::new(),
    )
    .await
    .expect_err("stopped is not success");

    assert_eq!(service.describe_calls.get(), 2);
    assert!(err.to_string().contains("Stopped"));
}
