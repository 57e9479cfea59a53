//! Integration tests for the trainstack CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! None of them reach a cloud endpoint: every command exercised here fails or
//! finishes before the `aws` CLI would be invoked.
