//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! cloud CLI adapter, filesystem access, HTTP downloads, and bundled assets.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod assets;
pub mod aws;
pub mod command_runner;
pub mod config;
pub mod fs;
pub mod http;
