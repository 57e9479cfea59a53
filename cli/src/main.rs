//! trainstack - provision training networks and launch distributed training jobs

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use trainstack_cli::cli::Cli;
use trainstack_cli::output::json::{error_code, format_error};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TRAINSTACK_LOG";

/// Exit status after a second interrupt (128 + SIGINT).
const INTERRUPTED_EXIT: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping (press Ctrl-C again to exit now)");
            on_signal.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(INTERRUPTED_EXIT);
            }
        }
    });

    match cli.run(cancel).await {
        Ok(code) => code,
        Err(e) => {
            if json {
                match format_error(&format!("{e:#}"), error_code(&e)) {
                    Ok(body) => println!("{body}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
