//! Integration test: configuration precedence (flag, then environment,
//! then default).
//!
//! Run: cargo test -p sockprobe-harness --test config_test

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use sockprobe_harness::HarnessConfig;
use sockprobe_harness::config::{ENV_BARRIER_MS, ENV_KEEPALIVE, ENV_LOG, ENV_STALL_LIMIT};
use sockprobe_harness::Cli;

fn cli(extra: &[&str]) -> Cli {
    let base = ["sockprobe", "p", "n", "random"];
    Cli::try_parse_from(base.iter().chain(extra.iter()).copied()).unwrap()
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_apply_with_nothing_set() {
    let config = HarnessConfig::from_lookup(&cli(&[]), env(&[]));
    assert_eq!(config, HarnessConfig::default());
    assert_eq!(config.barrier, Duration::from_secs(1));
    assert!(config.keepalive);
    assert_eq!(config.stall_limit, 64);
    assert!(config.log_path.is_none());
}

#[test]
fn environment_fills_in_unset_flags() {
    let config = HarnessConfig::from_lookup(
        &cli(&[]),
        env(&[
            (ENV_LOG, "/tmp/env.jsonl"),
            (ENV_BARRIER_MS, "250"),
            (ENV_KEEPALIVE, "off"),
            (ENV_STALL_LIMIT, "8"),
        ]),
    );
    assert_eq!(config.log_path, Some(PathBuf::from("/tmp/env.jsonl")));
    assert_eq!(config.barrier, Duration::from_millis(250));
    assert!(!config.keepalive);
    assert_eq!(config.stall_limit, 8);
    assert_eq!(config.run_options().engine.stall_limit, 8);
}

#[test]
fn flags_win_over_environment() {
    let config = HarnessConfig::from_lookup(
        &cli(&["--log", "/tmp/flag.jsonl", "--barrier-ms", "0", "--no-keepalive"]),
        env(&[
            (ENV_LOG, "/tmp/env.jsonl"),
            (ENV_BARRIER_MS, "250"),
            (ENV_KEEPALIVE, "on"),
        ]),
    );
    assert_eq!(config.log_path.as_deref(), Some(Path::new("/tmp/flag.jsonl")));
    assert_eq!(config.barrier, Duration::ZERO);
    assert!(!config.keepalive);
}

#[test]
fn unparseable_values_fall_back_to_defaults() {
    let config = HarnessConfig::from_lookup(
        &cli(&[]),
        env(&[
            (ENV_LOG, "  "),
            (ENV_BARRIER_MS, "soon"),
            (ENV_KEEPALIVE, "sometimes"),
            (ENV_STALL_LIMIT, "-3"),
        ]),
    );
    assert_eq!(config, HarnessConfig::default());
}
