//! `trainstack train`: provision, stage data, package source, launch.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use crate::app::AppContext;
use crate::application::WaitPolicy;
use crate::application::services::dataset::upload_dataset;
use crate::application::services::waiter::ensure_not_cancelled;
use crate::application::services::training::{launch_training, wait_for_training_job};
use crate::commands::data::{bucket_root, data_dir, default_data_uri, fetch};
use crate::commands::provision::{ProvisionArgs, StackArgs, provision_network};
use crate::domain::training::job_name_from_base;
use crate::domain::{ConfigError, MpiDistribution, S3Uri, TrainingJobSpec};
use crate::infra::fs::{LocalFs, SOURCE_ARCHIVE_NAME};

/// Arguments for the train command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Training script, relative to the source directory
    #[arg(long)]
    pub entry_point: Option<String>,

    /// Directory packaged and shipped to the training hosts
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Explicit job name (default: `training.job_base_name` plus a timestamp)
    #[arg(long)]
    pub job_name: Option<String>,

    /// Use training data already in object storage instead of staging it
    #[arg(long, value_name = "S3URI")]
    pub data: Option<S3Uri>,

    #[arg(long)]
    pub instance_type: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub instance_count: Option<u32>,

    /// MPI worker processes per host, usually one per GPU
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub processes_per_host: Option<u32>,

    /// Run without the network stack
    #[arg(long)]
    pub no_vpc: bool,

    /// Wait for the job to finish
    #[arg(long)]
    pub wait: bool,
}

/// Run the train command.
pub async fn run(app: &AppContext, args: TrainArgs) -> Result<ExitCode> {
    let cfg = &app.config.training;
    let role_arn = cfg
        .role_arn
        .clone()
        .ok_or(ConfigError::Missing("training.role_arn"))?;
    let image = cfg
        .image
        .clone()
        .ok_or(ConfigError::Missing("training.image"))?;
    let region = app
        .config
        .region
        .clone()
        .ok_or(ConfigError::Missing("region"))?;
    let root = bucket_root(app)?;

    let network = if args.no_vpc {
        None
    } else {
        let provision = ProvisionArgs {
            stack: args.stack,
            ..ProvisionArgs::default()
        };
        Some(provision_network(app, &provision).await?.1)
    };
    ensure_not_cancelled(&app.cancel, "training pipeline")?;

    let training_data = match args.data {
        Some(uri) => uri,
        None => {
            let dir = data_dir(app, None);
            fetch(app, &dir).await?;
            upload_dataset(
                &app.aws,
                &app.reporter(),
                &dir,
                &default_data_uri(app)?,
                &app.cancel,
            )
            .await?
        }
    };

    let job_name = args
        .job_name
        .unwrap_or_else(|| job_name_from_base(&cfg.job_base_name, Utc::now()));
    let submit_dir = root
        .join(&job_name)
        .join("source")
        .join(SOURCE_ARCHIVE_NAME);

    let spec = TrainingJobSpec {
        job_name,
        image,
        role_arn,
        region,
        instance_type: args
            .instance_type
            .unwrap_or_else(|| cfg.instance_type.clone()),
        instance_count: args.instance_count.unwrap_or(cfg.instance_count),
        volume_size_gb: cfg.volume_size_gb,
        max_runtime_secs: cfg.max_runtime_secs,
        entry_point: args
            .entry_point
            .unwrap_or_else(|| cfg.entry_point.clone()),
        submit_dir: submit_dir.to_string(),
        training_data: training_data.to_string(),
        output_path: root.join("output").to_string(),
        distribution: Some(MpiDistribution {
            processes_per_host: args.processes_per_host.unwrap_or(cfg.processes_per_host),
            custom_mpi_options: cfg.custom_mpi_options.clone(),
        }),
        network,
        hyperparameters: cfg.hyperparameters.clone(),
    };

    let source_dir = args
        .source_dir
        .unwrap_or_else(|| PathBuf::from(&cfg.source_dir));
    let staging = tempfile::tempdir().context("creating staging directory")?;
    let reporter = app.reporter();
    let job = launch_training(
        &LocalFs,
        &app.aws,
        &app.aws,
        &reporter,
        &spec,
        &source_dir,
        staging.path(),
        &app.cancel,
    )
    .await?;

    let last = if args.wait {
        let policy = WaitPolicy::new(
            std::time::Duration::from_secs(cfg.poll_interval_secs.max(1)),
            None,
        );
        Some(wait_for_training_job(&app.aws, &reporter, &job.name, &policy, &app.cancel).await?)
    } else {
        None
    };
    drop(reporter);

    app.renderer().render_training(&job, last.as_ref())?;
    Ok(ExitCode::SUCCESS)
}
