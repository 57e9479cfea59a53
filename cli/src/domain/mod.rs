//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod dataset;
pub mod error;
pub mod stack;
pub mod storage;
pub mod training;

pub use config::{LauncherConfig, OnExisting, apply_config_value};
pub use error::{ConfigError, DatasetError, ProvisionError, TrainingError, WaitError};
pub use stack::{
    CreateOutcome, InfrastructureRequest, NetworkOutputs, StackDescription, StackOutput,
    StackStatus, partition_outputs,
};
pub use storage::S3Uri;
pub use training::{
    CreateTrainingJobRequest, MpiDistribution, TrainingJobDescription, TrainingJobSpec,
    TrainingJobStatus,
};
