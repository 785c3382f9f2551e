//! CLI entrypoint for sockprobe.

use std::process::ExitCode;

use clap::Parser;
use sockprobe_abi::{HostNetwork, HostSocketApi};
use sockprobe_harness::keepalive::{self, IDLE_INTERVAL};
use sockprobe_harness::structured_log::LogEmitter;
use sockprobe_harness::{Cli, HarnessConfig, Reporter, RunKind};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = HarnessConfig::resolve(&cli);

    let mut reporter = Reporter::new(
        std::io::stdout(),
        std::io::stderr(),
        &cli.path,
        &cli.network_id,
    );
    if let Some(path) = &config.log_path {
        let run_id = format!("sockprobe-{}", std::process::id());
        eprintln!("Writing structured log to {}", path.display());
        reporter = reporter.with_log(LogEmitter::to_file(path, &run_id)?);
    }

    let mut network = HostNetwork::new();
    let code = sockprobe_harness::execute(
        &cli,
        &config,
        &mut network,
        HostSocketApi::new,
        &mut reporter,
    )?;
    reporter.finish()?;

    if matches!(cli.kind, RunKind::Comprehensive { .. }) && config.keepalive {
        eprintln!("comprehensive runs finished (exit code {code}); idling until interrupted");
        keepalive::idle_forever(IDLE_INTERVAL);
    }
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
