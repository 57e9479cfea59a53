//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::path::{Path, PathBuf};

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::application::services::training::LaunchedJob;
use crate::domain::{LauncherConfig, NetworkOutputs, S3Uri, TrainingJobDescription};

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Human or JSON rendering, chosen once per invocation.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Render the network identifiers of a ready stack.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_network(&self, stack: &str, network: &NetworkOutputs) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_network(stack, network);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_network(stack, network),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_teardown(&self, stack: &str, waited: bool) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_teardown(stack, waited);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_teardown(stack, waited),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_dataset(&self, paths: &[PathBuf]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_dataset(paths);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_dataset(paths),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_upload(&self, uri: &S3Uri) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_upload(uri);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_upload(uri),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_clean(&self, dir: &Path, removed: bool) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_clean(dir, removed);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_clean(dir, removed),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_training(
        &self,
        job: &LaunchedJob,
        last: Option<&TrainingJobDescription>,
    ) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_training(job, last);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_training(job, last),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(&self, config: &LauncherConfig, path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config(config, path);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_config(config, path),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config_set(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config_set(key, value);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_config_set(key, value),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_version(version),
        }
    }
}
