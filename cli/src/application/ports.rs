//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::Result;

use crate::domain::{
    CreateOutcome, CreateTrainingJobRequest, LauncherConfig, S3Uri, StackDescription,
    TrainingJobDescription,
};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── Provisioning Backend Port ─────────────────────────────────────────────────

/// Infrastructure-provisioning backend: named stacks built from templates.
#[allow(async_fn_in_trait)]
pub trait StackBackend {
    /// Submit a stack creation request.
    ///
    /// A name collision is reported as `Ok(CreateOutcome::AlreadyExists)`,
    /// every other rejection as `Err`.
    async fn create_stack(&self, name: &str, template_body: &str) -> Result<CreateOutcome>;
    /// Fetch the current status and outputs of a stack.
    ///
    /// A missing stack is reported as `ProvisionError::NotFound`.
    async fn describe_stack(&self, name: &str) -> Result<StackDescription>;
    /// Request deletion of a stack. Returns as soon as the request is accepted.
    async fn delete_stack(&self, name: &str) -> Result<()>;
}

// ── Object Storage Port ───────────────────────────────────────────────────────

/// Object storage uploads.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Upload a single file to `dest`.
    async fn upload_file(&self, local: &Path, dest: &S3Uri) -> Result<()>;
    /// Recursively upload a directory under the `dest` prefix.
    async fn upload_dir(&self, local: &Path, dest: &S3Uri) -> Result<()>;
}

// ── Training Service Port ─────────────────────────────────────────────────────

/// Managed training service.
#[allow(async_fn_in_trait)]
pub trait TrainingService {
    /// Submit a training job and return its ARN.
    async fn create_training_job(&self, request: &CreateTrainingJobRequest) -> Result<String>;
    /// Fetch the current status of a training job.
    async fn describe_training_job(&self, name: &str) -> Result<TrainingJobDescription>;
}

// ── Dataset Ports ─────────────────────────────────────────────────────────────

/// Fetches remote dataset files.
#[allow(async_fn_in_trait)]
pub trait DatasetDownloader {
    /// Download `url` to `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Abstracts file hashing operations.
pub trait FileHasher {
    /// Compute the SHA-256 hash of a file.
    fn sha256_file(&self, path: &Path) -> Result<String>;
}

/// Packages a training source directory for upload.
pub trait SourceArchiver {
    /// Write `dir` as a gzip-compressed tarball into `out_dir`; return its path.
    fn archive_dir(&self, dir: &Path, out_dir: &Path) -> Result<PathBuf>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when no file exists.
    fn load(&self) -> Result<LauncherConfig>;
    /// Persist the configuration.
    fn save(&self, config: &LauncherConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
