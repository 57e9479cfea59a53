//! `trainstack data`: fetch, upload and clean the training dataset.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::dataset::{fetch_dataset, upload_dataset};
use crate::domain::{ConfigError, S3Uri};
use crate::infra::fs::{LocalFs, remove_dir};
use crate::infra::http::UreqDownloader;

/// Data subcommands.
#[derive(Subcommand)]
pub enum DataCommand {
    /// Download the dataset files into the local dataset directory
    Fetch {
        /// Local dataset directory (default from `dataset.dir`)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Upload the local dataset directory to object storage
    Upload {
        /// Local dataset directory (default from `dataset.dir`)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Destination prefix (default: s3://<storage.bucket>/<storage.prefix>/data)
        #[arg(long)]
        dest: Option<S3Uri>,
    },
    /// Remove the local dataset directory
    Clean {
        /// Local dataset directory (default from `dataset.dir`)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Run the data command.
pub async fn run(app: &AppContext, cmd: DataCommand) -> Result<ExitCode> {
    match cmd {
        DataCommand::Fetch { dir } => {
            let paths = fetch(app, &data_dir(app, dir)).await?;
            app.renderer().render_dataset(&paths)?;
        }
        DataCommand::Upload { dir, dest } => {
            let dest = match dest {
                Some(d) => d,
                None => default_data_uri(app)?,
            };
            let uri = upload_dataset(
                &app.aws,
                &app.reporter(),
                &data_dir(app, dir),
                &dest,
                &app.cancel,
            )
            .await?;
            app.renderer().render_upload(&uri)?;
        }
        DataCommand::Clean { dir } => {
            let dir = data_dir(app, dir);
            let removed = remove_dir(&dir)?;
            app.renderer().render_clean(&dir, removed)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Download the configured dataset files into `dir`.
///
/// # Errors
///
/// Returns an error if any download or checksum check fails.
pub async fn fetch(app: &AppContext, dir: &std::path::Path) -> Result<Vec<PathBuf>> {
    fetch_dataset(
        &UreqDownloader::new(!app.output.show_progress(), app.cancel.clone()),
        &LocalFs,
        &app.reporter(),
        &app.config.dataset.files,
        dir,
        &app.cancel,
    )
    .await
}

/// Dataset directory from the flag, falling back to config.
#[must_use]
pub fn data_dir(app: &AppContext, dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| PathBuf::from(&app.config.dataset.dir))
}

/// `s3://<bucket>/<prefix>`, the root of everything this tool uploads.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] when `storage.bucket` is unset.
pub fn bucket_root(app: &AppContext) -> Result<S3Uri> {
    let bucket = app
        .config
        .storage
        .bucket
        .as_deref()
        .ok_or(ConfigError::Missing("storage.bucket"))?;
    Ok(S3Uri::new(bucket, &app.config.storage.prefix))
}

/// Default upload destination for the dataset.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] when `storage.bucket` is unset.
pub fn default_data_uri(app: &AppContext) -> Result<S3Uri> {
    Ok(bucket_root(app)?.join("data"))
}
