//! Command-line grammar.
//!
//! ```text
//! sockprobe <path> <network-id> simple <4|6> <client|server> <host> <port>
//! sockprobe <path> <network-id> sustained <4|6> <client|server> <host> <port> <operation> <count> <delay-ms>
//! sockprobe <path> <network-id> comprehensive <client|server> <ipv4-host> <ipv6-host> <port>
//! sockprobe <path> <network-id> random
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use sockprobe_core::{AddressFamily, Completion, MatrixPlan, Role, TestSpec};

/// Socket API conformance runs.
#[derive(Debug, Parser)]
#[command(name = "sockprobe")]
#[command(about = "Exercise a socket API with echo and sustained transfers")]
pub struct Cli {
    /// Storage path for the network service.
    pub path: PathBuf,
    /// Network to join before running.
    pub network_id: String,
    #[command(subcommand)]
    pub kind: RunKind,
    /// Append structured JSONL events to this file.
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,
    /// Pause between comprehensive runs, in milliseconds.
    #[arg(long, global = true)]
    pub barrier_ms: Option<u64>,
    /// Exit after the comprehensive matrix instead of idling.
    #[arg(long, global = true)]
    pub no_keepalive: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum RunKind {
    /// One write and one echoed read.
    Simple {
        /// Protocol: 4 or 6.
        family: AddressFamily,
        /// client or server.
        role: Role,
        host: String,
        port: u16,
    },
    /// Repeated transfer until a completion rule holds.
    Sustained {
        family: AddressFamily,
        role: Role,
        host: String,
        port: u16,
        operation: Operation,
        count: u64,
        /// Pause before every round, in milliseconds.
        delay_ms: u64,
    },
    /// Two families, both roles, two one-shot runs each.
    Comprehensive {
        role: Role,
        v4_host: String,
        v6_host: String,
        port: u16,
    },
    /// Random API fuzzing (not implemented).
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    #[value(name = "n_times")]
    NTimes,
    #[value(name = "n_bytes")]
    NBytes,
    #[value(name = "n_seconds")]
    NSeconds,
}

impl Operation {
    #[must_use]
    pub const fn completion(self, count: u64) -> Completion {
        match self {
            Self::NTimes => Completion::Iterations(count),
            Self::NBytes => Completion::Bytes(count),
            Self::NSeconds => Completion::Duration(count),
        }
    }
}

/// What one invocation executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Single(TestSpec),
    Matrix(MatrixPlan),
    Random,
}

impl RunKind {
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        match self {
            Self::Simple {
                family,
                role,
                host,
                port,
            } => Invocation::Single(TestSpec::one_shot(*role, *family, host.as_str(), *port)),
            Self::Sustained {
                family,
                role,
                host,
                port,
                operation,
                count,
                delay_ms,
            } => Invocation::Single(TestSpec::sustained(
                *role,
                *family,
                host.as_str(),
                *port,
                operation.completion(*count),
                Duration::from_millis(*delay_ms),
            )),
            Self::Comprehensive {
                role,
                v4_host,
                v6_host,
                port,
            } => Invocation::Matrix(MatrixPlan::new(*role, v4_host, v6_host, *port)),
            Self::Random => Invocation::Random,
        }
    }

    /// Whether the network service is brought up before running.
    #[must_use]
    pub const fn needs_bootstrap(&self) -> bool {
        !matches!(self, Self::Random)
    }

    /// Name printed in the parameter dump.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Simple { .. } => "simple",
            Self::Sustained { .. } => "sustained",
            Self::Comprehensive { .. } => "comprehensive",
            Self::Random => "random",
        }
    }
}
