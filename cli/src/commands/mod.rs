//! Command implementations

pub mod config;
pub mod data;
pub mod provision;
pub mod teardown;
pub mod train;
pub mod version;
