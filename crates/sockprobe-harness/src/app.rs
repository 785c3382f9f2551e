//! One invocation: bootstrap, then a single run or the matrix.

use std::io::Write;

use sockprobe_core::bootstrap::{self, BootstrapOptions};
use sockprobe_core::verify::EXIT_FAIL;
use sockprobe_core::{NetworkService, PayloadSpec, SleepBarrier, SocketApi, orchestrator};

use crate::cli::{Cli, Invocation};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::report::Reporter;

/// Execute `cli` and return the process exit code.
///
/// `api_for` is called once per run for a fresh socket API.
pub fn execute<S, A, F, O, E>(
    cli: &Cli,
    config: &HarnessConfig,
    service: &mut S,
    mut api_for: F,
    reporter: &mut Reporter<O, E>,
) -> Result<i32, HarnessError>
where
    S: NetworkService + ?Sized,
    A: SocketApi,
    F: FnMut() -> A,
    O: Write,
    E: Write,
{
    let invocation = cli.kind.invocation();
    if invocation == Invocation::Random {
        reporter.unsupported(cli.kind.name());
        return Ok(EXIT_FAIL);
    }

    if cli.kind.needs_bootstrap() {
        bootstrap::bootstrap(
            service,
            &cli.path,
            &cli.network_id,
            &BootstrapOptions::default(),
            |phase| reporter.bootstrap_phase(phase),
        )?;
    }

    let payload = PayloadSpec::default();
    let options = config.run_options();
    let code = match invocation {
        Invocation::Single(spec) => {
            reporter.run_started(&spec);
            let report = orchestrator::run(api_for(), &spec, &payload, &options);
            reporter.run_finished(&report);
            report.verdict.exit_code()
        }
        Invocation::Matrix(plan) => {
            let mut barrier = SleepBarrier::new(config.barrier);
            let report = plan.run(|_| api_for(), &mut barrier, &payload, &options, reporter);
            reporter.matrix_finished(&report);
            report.exit_code()
        }
        Invocation::Random => EXIT_FAIL,
    };
    Ok(code)
}
