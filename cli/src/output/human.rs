//! Human-readable terminal renderer.

use std::path::{Path, PathBuf};

use crate::application::services::training::LaunchedJob;
use crate::domain::{LauncherConfig, NetworkOutputs, S3Uri, TrainingJobDescription};
use crate::output::OutputContext;

/// Renders command results as human-readable terminal output.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub fn render_network(&self, stack: &str, network: &NetworkOutputs) {
        self.ctx.header(&format!("Stack {stack}"));
        if network.is_empty() {
            self.ctx.warn("stack exported no subnets or security groups");
            return;
        }
        self.ctx.kv("Subnets:        ", &join_or_none(&network.subnets));
        self.ctx.kv("Security groups:", &join_or_none(&network.security_groups));
    }

    pub fn render_teardown(&self, stack: &str, waited: bool) {
        if !waited {
            self.ctx
                .info(&format!("stack {stack} is being deleted in the background"));
        }
    }

    pub fn render_dataset(&self, paths: &[PathBuf]) {
        for path in paths {
            self.ctx.kv("File:", &path.display().to_string());
        }
    }

    pub fn render_upload(&self, uri: &S3Uri) {
        self.ctx.kv("Training data:", &uri.to_string());
    }

    pub fn render_clean(&self, dir: &Path, removed: bool) {
        if removed {
            self.ctx.success(&format!("removed {}", dir.display()));
        } else {
            self.ctx.info(&format!("{} does not exist", dir.display()));
        }
    }

    pub fn render_training(&self, job: &LaunchedJob, last: Option<&TrainingJobDescription>) {
        self.ctx.kv("Job:", &job.name);
        self.ctx.kv("ARN:", &job.arn);
        if let Some(d) = last {
            self.ctx.kv("Status:", d.status.as_str());
        } else {
            self.ctx.info(&format!(
                "not waiting; check progress with: aws sagemaker describe-training-job --training-job-name {}",
                job.name
            ));
        }
    }

    pub fn render_config(&self, config: &LauncherConfig, path: &Path) {
        self.ctx.header("Configuration");
        self.ctx.kv("File:", &path.display().to_string());
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "(not set)".to_string());
        self.ctx.kv("region", &opt(&config.region));
        self.ctx.kv("profile", &opt(&config.profile));
        self.ctx.kv("provision.stack_name", &config.provision.stack_name);
        self.ctx.kv(
            "provision.template",
            &config
                .provision
                .template
                .clone()
                .unwrap_or_else(|| "(bundled VPC template)".to_string()),
        );
        self.ctx.kv(
            "provision.poll_interval_ms",
            &config.provision.poll_interval_ms.to_string(),
        );
        self.ctx
            .kv("provision.timeout_secs", &config.provision.timeout_secs.to_string());
        self.ctx
            .kv("provision.on_existing", config.provision.on_existing.as_str());
        self.ctx.kv("storage.bucket", &opt(&config.storage.bucket));
        self.ctx.kv("storage.prefix", &config.storage.prefix);
        self.ctx.kv("dataset.dir", &config.dataset.dir);
        self.ctx.kv("training.role_arn", &opt(&config.training.role_arn));
        self.ctx.kv("training.image", &opt(&config.training.image));
        self.ctx.kv("training.instance_type", &config.training.instance_type);
        self.ctx.kv(
            "training.instance_count",
            &config.training.instance_count.to_string(),
        );
        self.ctx.kv(
            "training.processes_per_host",
            &config.training.processes_per_host.to_string(),
        );
        self.ctx
            .kv("training.custom_mpi_options", &config.training.custom_mpi_options);
        self.ctx.kv(
            "training.volume_size_gb",
            &config.training.volume_size_gb.to_string(),
        );
        self.ctx.kv(
            "training.max_runtime_secs",
            &config.training.max_runtime_secs.to_string(),
        );
        self.ctx.kv("training.entry_point", &config.training.entry_point);
        self.ctx.kv("training.source_dir", &config.training.source_dir);
        self.ctx.kv("training.job_base_name", &config.training.job_base_name);
        self.ctx.kv(
            "training.poll_interval_secs",
            &config.training.poll_interval_secs.to_string(),
        );
    }

    pub fn render_config_set(&self, key: &str, value: &str) {
        self.ctx.success(&format!("{key} = {value}"));
    }

    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("trainstack {version}");
        }
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
