//! Infrastructure stack types: requests, status values, and output partitioning.
//!
//! Pure types only. The status strings are the provisioning backend's own
//! values; everything the tool does not name explicitly is kept verbatim in
//! [`StackStatus::Other`] so it can be reported back to the user.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named infrastructure creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureRequest {
    /// Stack name. Identity of the request.
    pub name: String,
    /// Declarative template body, passed to the backend unmodified.
    pub template: String,
}

/// Outcome of a create submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The backend accepted the request.
    Created { stack_id: String },
    /// A stack with the same name already exists.
    AlreadyExists,
}

/// Stack status as reported by the provisioning backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackStatus {
    CreateInProgress,
    CreateComplete,
    DeleteInProgress,
    DeleteComplete,
    Other(String),
}

impl StackStatus {
    /// The backend's literal value for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for StackStatus {
    fn from(value: &str) -> Self {
        match value {
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named stack output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    #[serde(rename = "OutputKey")]
    pub key: String,
    #[serde(rename = "OutputValue")]
    pub value: String,
}

impl StackOutput {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Point-in-time view of a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescription {
    pub name: String,
    pub status: StackStatus,
    /// Human-readable reason attached to the status, when the backend gives one.
    pub status_reason: Option<String>,
    /// Outputs in the order the backend reported them.
    pub outputs: Vec<StackOutput>,
}

/// Network identifiers extracted from a completed stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOutputs {
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
}

impl NetworkOutputs {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subnets.is_empty() && self.security_groups.is_empty()
    }
}

/// What kind of network resource an output key names, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    SecurityGroup,
    Subnet,
}

/// Classify an output key by name.
///
/// Matching is ASCII case-insensitive. `SecurityGroup` is checked first so a
/// key such as `SubnetSecurityGroupId` counts as a security group.
#[must_use]
pub fn classify_output_key(key: &str) -> Option<OutputKind> {
    let key = key.to_ascii_lowercase();
    if key.contains("securitygroup") {
        Some(OutputKind::SecurityGroup)
    } else if key.contains("subnet") {
        Some(OutputKind::Subnet)
    } else {
        None
    }
}

/// Split stack outputs into subnets and security groups, preserving order.
/// Unrecognized keys are dropped.
#[must_use]
pub fn partition_outputs(outputs: &[StackOutput]) -> NetworkOutputs {
    let mut network = NetworkOutputs::default();
    for output in outputs {
        match classify_output_key(&output.key) {
            Some(OutputKind::SecurityGroup) => network.security_groups.push(output.value.clone()),
            Some(OutputKind::Subnet) => network.subnets.push(output.value.clone()),
            None => {}
        }
    }
    network
}
