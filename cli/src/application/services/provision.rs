//! Infrastructure provisioning: create-or-reuse a stack, wait, extract outputs.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ProgressReporter, StackBackend};
use crate::application::services::waiter::{WaitPolicy, ensure_not_cancelled, poll_until};
use crate::domain::{
    CreateOutcome, InfrastructureRequest, NetworkOutputs, OnExisting, ProvisionError,
    StackDescription, StackStatus, partition_outputs,
};

/// Knobs for [`ensure_infrastructure`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    pub wait: WaitPolicy,
    pub on_existing: OnExisting,
}

/// Make sure the stack described by `request` exists and is complete, then
/// return its subnets and security groups.
///
/// # Errors
///
/// - the backend rejects the submission for any reason other than a name
///   collision (no status is polled in that case);
/// - the name collides and `on_existing` is [`OnExisting::Fail`];
/// - `cancel` fires before submission, or the wait times out or is cancelled;
/// - the stack settles in any state other than `CREATE_COMPLETE`.
pub async fn ensure_infrastructure(
    backend: &impl StackBackend,
    reporter: &impl ProgressReporter,
    request: &InfrastructureRequest,
    options: &ProvisionOptions,
    cancel: &CancellationToken,
) -> Result<NetworkOutputs> {
    let name = request.name.as_str();
    ensure_not_cancelled(cancel, &format!("stack '{name}'"))?;

    reporter.step(&format!("creating stack {name}..."));
    match backend.create_stack(name, &request.template).await {
        Ok(CreateOutcome::Created { stack_id }) => {
            tracing::info!(stack = name, %stack_id, "stack creation submitted");
        }
        Ok(CreateOutcome::AlreadyExists) => match options.on_existing {
            OnExisting::Reuse => {
                tracing::warn!(
                    stack = name,
                    "stack already exists; reusing it without comparing templates"
                );
                reporter.warn(&format!(
                    "stack {name} already exists, reusing it (template not compared)"
                ));
            }
            OnExisting::Fail => {
                return Err(ProvisionError::AlreadyExists {
                    name: name.to_string(),
                }
                .into());
            }
        },
        Err(e) => {
            return Err(ProvisionError::Submission {
                name: name.to_string(),
                message: format!("{e:#}"),
            }
            .into());
        }
    }

    reporter.step(&format!("waiting for stack {name}..."));
    let description = wait_for_stack(backend, name, &options.wait, cancel).await?;

    if description.status != StackStatus::CreateComplete {
        return Err(unexpected_state(description).into());
    }

    let network = partition_outputs(&description.outputs);
    tracing::info!(
        stack = name,
        subnets = network.subnets.len(),
        security_groups = network.security_groups.len(),
        "stack ready"
    );
    reporter.success(&format!("stack {name} ready"));
    Ok(network)
}

/// Poll `describe_stack` until the status is no longer `CREATE_IN_PROGRESS`.
///
/// # Errors
///
/// Returns an error if a describe call fails, or on timeout / cancellation.
pub async fn wait_for_stack(
    backend: &impl StackBackend,
    name: &str,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> Result<StackDescription> {
    poll_until(
        &format!("stack '{name}'"),
        policy,
        cancel,
        || backend.describe_stack(name),
        |d: &StackDescription| d.status != StackStatus::CreateInProgress,
    )
    .await
}

/// Delete a stack and, when `wait` is given, poll until the deletion settles.
///
/// A stack that has disappeared counts as deleted.
///
/// # Errors
///
/// Returns an error if the delete request fails, the wait times out or is
/// cancelled, or the stack settles in a state other than `DELETE_COMPLETE`.
pub async fn teardown_infrastructure(
    backend: &impl StackBackend,
    reporter: &impl ProgressReporter,
    name: &str,
    wait: Option<&WaitPolicy>,
    cancel: &CancellationToken,
) -> Result<()> {
    reporter.step(&format!("deleting stack {name}..."));
    backend
        .delete_stack(name)
        .await
        .with_context(|| format!("deleting stack {name}"))?;
    tracing::info!(stack = name, "stack deletion submitted");

    let Some(policy) = wait else {
        reporter.success(&format!("deletion of stack {name} requested"));
        return Ok(());
    };

    let description = poll_until(
        &format!("deletion of stack '{name}'"),
        policy,
        cancel,
        || describe_or_gone(backend, name),
        |d: &StackDescription| d.status != StackStatus::DeleteInProgress,
    )
    .await?;

    if description.status != StackStatus::DeleteComplete {
        return Err(unexpected_state(description).into());
    }
    reporter.success(&format!("stack {name} deleted"));
    Ok(())
}

async fn describe_or_gone(backend: &impl StackBackend, name: &str) -> Result<StackDescription> {
    match backend.describe_stack(name).await {
        Err(e)
            if matches!(
                e.downcast_ref::<ProvisionError>(),
                Some(ProvisionError::NotFound { .. })
            ) =>
        {
            Ok(StackDescription {
                name: name.to_string(),
                status: StackStatus::DeleteComplete,
                status_reason: None,
                outputs: Vec::new(),
            })
        }
        other => other,
    }
}

fn unexpected_state(description: StackDescription) -> ProvisionError {
    ProvisionError::UnexpectedTerminalState {
        name: description.name,
        state: description.status.to_string(),
        reason: description.status_reason,
    }
}
