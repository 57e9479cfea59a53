//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Provision cloud networking and launch distributed training jobs
#[derive(Parser)]
#[command(
    name = "trainstack",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Cloud region (overrides config)
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Credentials profile (overrides config)
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create (or reuse) the network stack and print its subnets and security groups
    Provision(commands::provision::ProvisionArgs),

    /// Delete the network stack
    Teardown(commands::teardown::TeardownArgs),

    /// Manage the local and uploaded dataset
    #[command(subcommand)]
    Data(commands::data::DataCommand),

    /// Package the training script and launch a distributed training job
    Train(commands::train::TrainArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the command fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose: _,
            yes,
            region,
            profile,
            command,
        } = self;
        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags {
                yes,
                region,
                profile,
            },
        };
        let app = AppContext::new(&flags, cancel)?;

        match command {
            Command::Provision(args) => commands::provision::run(&app, &args).await,
            Command::Teardown(args) => commands::teardown::run(&app, &args).await,
            Command::Data(cmd) => commands::data::run(&app, cmd).await,
            Command::Train(args) => commands::train::run(&app, args).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
