//! Harness configuration.
//!
//! Each setting comes from its command-line flag if given, then from the
//! environment, then from the default:
//! - `SOCKPROBE_LOG`: JSONL log path (default: no log).
//! - `SOCKPROBE_BARRIER_MS`: pause between comprehensive runs (default 1000).
//! - `SOCKPROBE_KEEPALIVE`: idle after the comprehensive matrix,
//!   `on|true|1|yes` or `off|false|0|no` (default on).
//! - `SOCKPROBE_STALL_LIMIT`: byte-count stall guard (default 64, 0 disables).
//!
//! Values that do not parse fall back to the default.

use std::path::PathBuf;
use std::time::Duration;

use sockprobe_core::barrier::DEFAULT_PAUSE;
use sockprobe_core::engine::DEFAULT_STALL_LIMIT;
use sockprobe_core::{EngineOptions, RunOptions};

use crate::cli::Cli;

pub const ENV_LOG: &str = "SOCKPROBE_LOG";
pub const ENV_BARRIER_MS: &str = "SOCKPROBE_BARRIER_MS";
pub const ENV_KEEPALIVE: &str = "SOCKPROBE_KEEPALIVE";
pub const ENV_STALL_LIMIT: &str = "SOCKPROBE_STALL_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub log_path: Option<PathBuf>,
    pub barrier: Duration,
    pub keepalive: bool,
    pub stall_limit: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            barrier: DEFAULT_PAUSE,
            keepalive: true,
            stall_limit: DEFAULT_STALL_LIMIT,
        }
    }
}

impl HarnessConfig {
    /// Resolve against the process environment.
    #[must_use]
    pub fn resolve(cli: &Cli) -> Self {
        Self::from_lookup(cli, |key| std::env::var(key).ok())
    }

    /// Resolve with `lookup` standing in for the environment.
    #[must_use]
    pub fn from_lookup(cli: &Cli, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let log_path = cli.log.clone().or_else(|| {
            lookup(ENV_LOG)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        });

        let barrier = cli
            .barrier_ms
            .or_else(|| lookup(ENV_BARRIER_MS).and_then(|v| v.trim().parse().ok()))
            .map_or(defaults.barrier, Duration::from_millis);

        let keepalive = if cli.no_keepalive {
            false
        } else {
            lookup(ENV_KEEPALIVE)
                .and_then(|v| parse_switch_loose(&v))
                .unwrap_or(defaults.keepalive)
        };

        let stall_limit = lookup(ENV_STALL_LIMIT)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.stall_limit);

        Self {
            log_path,
            barrier,
            keepalive,
            stall_limit,
        }
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            engine: EngineOptions {
                stall_limit: self.stall_limit,
            },
            backlog: None,
        }
    }
}

/// Parse an on/off switch (case-insensitive). `None` if unrecognized.
#[must_use]
pub fn parse_switch_loose(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
