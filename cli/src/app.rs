//! Application context: unified state passed to every command handler.
//!
//! `AppContext` bundles output settings, the loaded configuration, the cloud
//! adapter and the cancellation token, so command handlers take one argument.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::application::ports::ConfigStore;
use crate::domain::LauncherConfig;
use crate::infra::aws::AwsCli;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `TRAINSTACK_YES` env vars).
    pub yes: bool,
    /// Region override for every cloud call.
    pub region: Option<String>,
    /// Credentials profile override.
    pub profile: Option<String>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Configuration file store.
    pub config_store: YamlConfigStore,
    /// Configuration loaded at startup, with CLI overrides applied.
    pub config: LauncherConfig,
    /// Cloud adapter for stacks, storage and training jobs.
    pub aws: AwsCli<TokioCommandRunner>,
    /// Cancelled on Ctrl-C; every wait observes it.
    pub cancel: CancellationToken,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `TRAINSTACK_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read.
    pub fn new(flags: &AppFlags, cancel: CancellationToken) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("TRAINSTACK_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        let config_store = YamlConfigStore;
        let mut config = config_store.load()?;
        if let Some(region) = &flags.behaviour.region {
            config.region = Some(region.clone());
        }
        if let Some(profile) = &flags.behaviour.profile {
            config.profile = Some(profile.clone());
        }
        let aws = AwsCli::default_runner(config.region.clone(), config.profile.clone());

        Ok(Self {
            // JSON mode keeps stdout for the result object.
            output: OutputContext::new(flags.output.no_color, flags.output.quiet || flags.output.json),
            mode,
            config_store,
            config,
            aws,
            cancel,
            non_interactive,
        })
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter bound to this context's output settings.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `TRAINSTACK_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
