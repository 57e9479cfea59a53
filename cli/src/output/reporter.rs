//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! Steps are shown as a spinner on a TTY and as plain `→` lines otherwise.
//! Each `success` / `warn` closes the running spinner first.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// Everything is suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    spinner: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            spinner: RefCell::new(None),
        }
    }

    fn clear_spinner(&self) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if self.ctx.show_progress() {
            let mut slot = self.spinner.borrow_mut();
            match slot.as_ref() {
                Some(pb) => pb.set_message(message.to_string()),
                None => *slot = Some(progress::spinner(message)),
            }
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        self.clear_spinner();
        self.ctx.success(message);
    }

    fn warn(&self, message: &str) {
        self.clear_spinner();
        self.ctx.warn(message);
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        self.clear_spinner();
    }
}
