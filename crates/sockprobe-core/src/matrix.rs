//! Comprehensive test matrix: every family, both roles.
//!
//! For each family the plan holds two one-shot runs in the configured
//! role followed by two in the swapped role. Each family starts again
//! from the configured role, so two processes started with opposite roles
//! stay complementary for all eight steps. A [`Barrier`] wait separates
//! every consecutive pair of steps, including the family boundary.
//!
//! The IPv6 half does not inherit the swapped role from the end of the
//! IPv4 half, and the family boundary gets a barrier wait like any other
//! step boundary.

use serde::Serialize;

use crate::barrier::Barrier;
use crate::orchestrator::{self, RunOptions, RunReport};
use crate::payload::PayloadSpec;
use crate::socket::SocketApi;
use crate::spec::{AddressFamily, Role, TestSpec};
use crate::verify::{EXIT_FAIL, EXIT_PASS};

/// Runs per family before and after the role swap.
pub const RUNS_PER_ROLE: usize = 2;

const FAMILIES: [AddressFamily; 2] = [AddressFamily::V4, AddressFamily::V6];

/// One planned run. `index` counts from zero across the whole matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixStep {
    pub index: usize,
    pub spec: TestSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixPlan {
    steps: Vec<MatrixStep>,
}

impl MatrixPlan {
    #[must_use]
    pub fn new(role: Role, v4_host: &str, v6_host: &str, port: u16) -> Self {
        let mut steps = Vec::with_capacity(FAMILIES.len() * RUNS_PER_ROLE * 2);
        for family in FAMILIES {
            let host = match family {
                AddressFamily::V4 => v4_host,
                AddressFamily::V6 => v6_host,
            };
            for step_role in [role, role.swapped()] {
                for _ in 0..RUNS_PER_ROLE {
                    steps.push(MatrixStep {
                        index: steps.len(),
                        spec: TestSpec::one_shot(step_role, family, host, port),
                    });
                }
            }
        }
        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[MatrixStep] {
        &self.steps
    }

    /// Run every step in order. `api_for` supplies the socket API for a
    /// step; `barrier` is waited on before every step except the first.
    pub fn run<A, F, B, O>(
        &self,
        mut api_for: F,
        barrier: &mut B,
        payload: &PayloadSpec,
        options: &RunOptions,
        observer: &mut O,
    ) -> MatrixReport
    where
        A: SocketApi,
        F: FnMut(&MatrixStep) -> A,
        B: Barrier + ?Sized,
        O: MatrixObserver + ?Sized,
    {
        let mut runs = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if step.index > 0 {
                barrier.wait(step);
            }
            observer.before_run(step);
            let report = orchestrator::run(api_for(step), &step.spec, payload, options);
            observer.after_run(step, &report);
            runs.push(report);
        }
        MatrixReport::new(runs)
    }
}

/// Hooks around each matrix step.
pub trait MatrixObserver {
    fn before_run(&mut self, _step: &MatrixStep) {}
    fn after_run(&mut self, _step: &MatrixStep, _report: &RunReport) {}
}

impl MatrixObserver for () {}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixReport {
    pub runs: Vec<RunReport>,
    pub passed: bool,
}

impl MatrixReport {
    fn new(runs: Vec<RunReport>) -> Self {
        let passed = !runs.is_empty() && runs.iter().all(RunReport::passed);
        Self { runs, passed }
    }

    #[must_use]
    pub fn failed_runs(&self) -> usize {
        self.runs.iter().filter(|r| !r.passed()).count()
    }

    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.passed { EXIT_PASS } else { EXIT_FAIL }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address;
    use crate::sim::SimNetwork;
    use std::time::Duration;

    struct Recording(Vec<usize>);

    impl Barrier for Recording {
        fn wait(&mut self, next: &MatrixStep) {
            self.0.push(next.index);
        }
    }

    /// Both simulated processes meet here before each step.
    struct Lockstep<'a> {
        gate: &'a std::sync::Barrier,
        waits: usize,
    }

    impl Barrier for Lockstep<'_> {
        fn wait(&mut self, _next: &MatrixStep) {
            self.waits += 1;
            self.gate.wait();
        }
    }

    #[derive(Default)]
    struct Trace(Vec<(usize, Role, bool)>);

    impl MatrixObserver for Trace {
        fn after_run(&mut self, step: &MatrixStep, report: &RunReport) {
            self.0.push((step.index, step.spec.role, report.passed()));
        }
    }

    #[test]
    fn plan_swaps_roles_after_two_runs_per_family() {
        let plan = MatrixPlan::new(Role::Initiator, "10.0.0.1", "fd00::1", 9000);
        let shape: Vec<_> = plan
            .steps()
            .iter()
            .map(|s| (s.index, s.spec.family, s.spec.role, s.spec.host.as_str()))
            .collect();
        use AddressFamily::{V4, V6};
        use Role::{Initiator as I, Responder as R};
        assert_eq!(
            shape,
            vec![
                (0, V4, I, "10.0.0.1"),
                (1, V4, I, "10.0.0.1"),
                (2, V4, R, "10.0.0.1"),
                (3, V4, R, "10.0.0.1"),
                (4, V6, I, "fd00::1"),
                (5, V6, I, "fd00::1"),
                (6, V6, R, "fd00::1"),
                (7, V6, R, "fd00::1"),
            ]
        );
        assert!(plan.steps().iter().all(|s| s.spec.port == 9000));
    }

    #[test]
    fn complementary_plans_line_up_step_for_step() {
        let client = MatrixPlan::new(Role::Initiator, "a", "b", 1);
        let server = MatrixPlan::new(Role::Responder, "a", "b", 1);
        for (c, s) in client.steps().iter().zip(server.steps()) {
            assert_eq!(c.spec.role, s.spec.role.swapped());
            assert_eq!(c.spec.family, s.spec.family);
        }
    }

    #[test]
    fn barrier_separates_every_step_and_one_failure_fails_the_matrix() {
        let net = SimNetwork::with_block_timeout(Duration::from_millis(10));
        net.echo_listener("127.0.0.1:9100".parse().unwrap());
        net.echo_listener("[::1]:9100".parse().unwrap());
        let plan = MatrixPlan::new(Role::Initiator, "127.0.0.1", "::1", 9100);
        let mut barrier = Recording(Vec::new());
        let mut trace = Trace::default();

        let report = plan.run(
            |_| net.endpoint(),
            &mut barrier,
            &PayloadSpec::default(),
            &RunOptions::default(),
            &mut trace,
        );

        assert_eq!(barrier.0, vec![1, 2, 3, 4, 5, 6, 7]);
        // Responder steps have nobody to accept from.
        let verdicts: Vec<bool> = trace.0.iter().map(|(_, _, passed)| *passed).collect();
        assert_eq!(
            verdicts,
            vec![true, true, false, false, true, true, false, false]
        );
        assert_eq!(report.failed_runs(), 4);
        assert!(!report.passed);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn two_processes_pass_the_whole_matrix() {
        let net = SimNetwork::new();
        let gate = std::sync::Barrier::new(2);
        let payload = PayloadSpec::default();
        let options = RunOptions::default();

        let run_side = |role: Role| {
            let plan = MatrixPlan::new(role, "127.0.0.1", "::1", 9200);
            let mut barrier = Lockstep {
                gate: &gate,
                waits: 0,
            };
            let report = plan.run(
                |step: &MatrixStep| {
                    if step.spec.role == Role::Initiator {
                        let spec = &step.spec;
                        let addr = address::select(spec.family, &spec.host, spec.port, spec.role)
                            .unwrap();
                        assert!(net.wait_listening(&addr));
                    }
                    net.endpoint()
                },
                &mut barrier,
                &payload,
                &options,
                &mut (),
            );
            (report, barrier.waits)
        };

        let (client, server) = std::thread::scope(|scope| {
            let server = scope.spawn(|| run_side(Role::Responder));
            let client = run_side(Role::Initiator);
            (client, server.join().unwrap())
        });

        for (report, waits) in [&client, &server] {
            assert_eq!(report.runs.len(), 8);
            assert!(report.passed, "failed runs: {}", report.failed_runs());
            assert_eq!(*waits, 7);
        }
        assert_eq!(net.open_sockets(), 0);
    }
}
