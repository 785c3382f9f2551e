//! Command-line conformance runner for sockprobe.
//!
//! This crate provides:
//! - CLI grammar for simple, sustained, comprehensive and random runs
//! - Configuration resolved from flags, environment and defaults
//! - Structured JSONL run evidence
//! - Console reporting (parameter dumps, PASSED/FAILED)
//! - The post-matrix keepalive idle state

#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod report;
pub mod structured_log;

pub use app::execute;
pub use cli::{Cli, Invocation, RunKind};
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use report::Reporter;
