//! `trainstack teardown`: delete the network stack.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::WaitPolicy;
use crate::application::services::provision::teardown_infrastructure;
use crate::commands::provision::stack_name;

/// Arguments for the teardown command.
#[derive(Args, Debug)]
pub struct TeardownArgs {
    /// Stack name (default from `provision.stack_name`)
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Return once deletion is requested instead of waiting for it
    #[arg(long)]
    pub no_wait: bool,
}

/// Run the teardown command.
pub async fn run(app: &AppContext, args: &TeardownArgs) -> Result<ExitCode> {
    let name = stack_name(app, args.stack_name.as_deref());

    if !app.non_interactive
        && !app.confirm(&format!("Delete stack {name} and all its resources?"), false)?
    {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let cfg = &app.config.provision;
    let policy = WaitPolicy::new(cfg.poll_interval(), cfg.timeout());
    let wait = (!args.no_wait).then_some(&policy);

    teardown_infrastructure(&app.aws, &app.reporter(), &name, wait, &app.cancel).await?;
    app.renderer().render_teardown(&name, wait.is_some())?;
    Ok(ExitCode::SUCCESS)
}
