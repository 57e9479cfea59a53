//! `trainstack provision`: create or reuse the network stack.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::WaitPolicy;
use crate::application::services::provision::{ProvisionOptions, ensure_infrastructure};
use crate::domain::{InfrastructureRequest, NetworkOutputs, OnExisting};
use crate::infra::assets::load_template;

/// Stack selection shared by `provision` and `train`.
#[derive(Args, Debug, Default)]
pub struct StackArgs {
    /// Stack name (default from `provision.stack_name`)
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Template file (default: bundled VPC template)
    #[arg(long)]
    pub template: Option<PathBuf>,
}

/// Arguments for the provision command.
#[derive(Args, Debug, Default)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Give up after this many seconds (0 waits forever)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Delay between status checks in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: Option<u64>,

    /// What to do when the stack already exists
    #[arg(long, value_parser = ["reuse", "fail"])]
    pub on_existing: Option<String>,
}

/// Run the provision command.
pub async fn run(app: &AppContext, args: &ProvisionArgs) -> Result<ExitCode> {
    let (name, network) = provision_network(app, args).await?;
    app.renderer().render_network(&name, &network)?;
    Ok(ExitCode::SUCCESS)
}

/// Resolve settings from flags and config, then ensure the stack.
///
/// Returns the stack name with its network outputs.
///
/// # Errors
///
/// Returns an error if the template cannot be read or provisioning fails.
pub async fn provision_network(
    app: &AppContext,
    args: &ProvisionArgs,
) -> Result<(String, NetworkOutputs)> {
    let cfg = &app.config.provision;
    let name = stack_name(app, args.stack.stack_name.as_deref());
    let template_path = args
        .stack
        .template
        .clone()
        .or_else(|| cfg.template.as_ref().map(PathBuf::from));
    let request = InfrastructureRequest {
        name: name.clone(),
        template: load_template(template_path.as_deref())?,
    };

    let interval = args
        .poll_interval
        .map_or_else(|| cfg.poll_interval(), Duration::from_millis);
    let timeout = match args.timeout {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => cfg.timeout(),
    };
    let on_existing = match args.on_existing.as_deref() {
        Some("fail") => OnExisting::Fail,
        Some(_) => OnExisting::Reuse,
        None => cfg.on_existing,
    };
    let options = ProvisionOptions {
        wait: WaitPolicy::new(interval, timeout),
        on_existing,
    };

    let network = ensure_infrastructure(
        &app.aws,
        &app.reporter(),
        &request,
        &options,
        &app.cancel,
    )
    .await?;
    Ok((name, network))
}

/// Stack name from the flag, falling back to config.
#[must_use]
pub fn stack_name(app: &AppContext, flag: Option<&str>) -> String {
    flag.map_or_else(
        || app.config.provision.stack_name.clone(),
        str::to_string,
    )
}
