//! Wait-until-settled polling shared by stack and training job waits, plus
//! the cancellation checks used between long-running steps.
//!
//! Imports only from `crate::domain`.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::WaitError;

/// How often to poll and how long to keep trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Fixed delay between two probes.
    pub interval: Duration,
    /// Overall deadline measured from the first probe. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl WaitPolicy {
    #[must_use]
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            timeout: Some(Duration::from_secs(1800)),
        }
    }
}

/// Call `probe` until `settled` accepts its value, then return that value.
///
/// Between probes the task sleeps for `policy.interval`. The deadline is
/// checked after every unsettled probe, so the last probe may land exactly
/// on it but never after it.
///
/// # Errors
///
/// - any error returned by `probe`, unchanged and without retrying;
/// - [`WaitError::TimedOut`] once `policy.timeout` has elapsed;
/// - [`WaitError::Cancelled`] as soon as `cancel` fires during a sleep.
pub async fn poll_until<T, F, Fut, S>(
    what: &str,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
    mut probe: F,
    mut settled: S,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    S: FnMut(&T) -> bool,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled { what: what.to_string() }.into());
        }

        attempt += 1;
        let value = probe().await?;
        if settled(&value) {
            tracing::debug!(what, attempt, "settled");
            return Ok(value);
        }

        let waited = started.elapsed();
        if policy.timeout.is_some_and(|t| waited >= t) {
            return Err(WaitError::TimedOut {
                what: what.to_string(),
                waited,
            }
            .into());
        }
        tracing::debug!(what, attempt, "still in progress");

        tokio::select! {
            () = cancel.cancelled() => {
                return Err(WaitError::Cancelled { what: what.to_string() }.into());
            }
            () = tokio::time::sleep(policy.interval) => {}
        }
    }
}

/// Fail with [`WaitError::Cancelled`] once `cancel` has fired.
///
/// # Errors
///
/// Returns [`WaitError::Cancelled`] naming `what` when the token is cancelled.
pub fn ensure_not_cancelled(cancel: &CancellationToken, what: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(WaitError::Cancelled { what: what.to_string() }.into());
    }
    Ok(())
}

/// Drive `work` to completion unless `cancel` fires first.
///
/// An already-cancelled token wins without polling `work`, so no side effect
/// of `work` starts.
///
/// # Errors
///
/// Returns the error from `work`, or [`WaitError::Cancelled`] naming `what`.
pub async fn until_cancelled<T>(
    what: &str,
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            Err(WaitError::Cancelled { what: what.to_string() }.into())
        }
        result = work => result,
    }
}
