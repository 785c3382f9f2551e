//! Human-readable progress plus structured log events for each run.
//!
//! Parameter dumps and bootstrap progress go to `out`; `PASSED`/`FAILED`
//! and failure reasons go to `err`. Write failures do not interrupt a run;
//! the first one is kept and surfaced by [`Reporter::finish`].

use std::io::Write;
use std::path::Path;

use sockprobe_core::{
    BootstrapPhase, MatrixObserver, MatrixReport, MatrixStep, RunReport, TestSpec,
};

use crate::error::HarnessError;
use crate::structured_log::{
    EVENT_BOOTSTRAP_PHASE, EVENT_MATRIX_VERDICT, EVENT_RUN_START, EVENT_RUN_VERDICT, LogEmitter,
    LogEntry, LogLevel, Outcome,
};

pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
    log: Option<LogEmitter>,
    path: String,
    network_id: String,
    first_error: Option<HarnessError>,
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E, path: &Path, network_id: &str) -> Self {
        Self {
            out,
            err,
            log: None,
            path: path.display().to_string(),
            network_id: network_id.to_string(),
            first_error: None,
        }
    }

    #[must_use]
    pub fn with_log(mut self, log: LogEmitter) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn log(&self) -> Option<&LogEmitter> {
        self.log.as_ref()
    }

    fn keep(&mut self, result: Result<(), HarnessError>) {
        if let Err(err) = result
            && self.first_error.is_none()
        {
            self.first_error = Some(err);
        }
    }

    fn emit(&mut self, build: impl FnOnce(LogEntry) -> LogEntry, level: LogLevel, event: &str) {
        let Some(log) = self.log.as_mut() else {
            return;
        };
        let entry = build(log.entry(level, event));
        let result = log.emit_entry(entry).map_err(HarnessError::Log);
        self.keep(result);
    }

    pub fn bootstrap_phase(&mut self, phase: BootstrapPhase) {
        let result = writeln!(self.out, "{}", phase.message()).map_err(HarnessError::Console);
        self.keep(result);
        self.emit(
            |e| {
                e.with_details(serde_json::json!({
                    "phase": phase,
                    "message": phase.message(),
                }))
            },
            LogLevel::Info,
            EVENT_BOOTSTRAP_PHASE,
        );
    }

    /// Print every parameter of the coming run.
    pub fn run_started(&mut self, spec: &TestSpec) {
        let mut lines = vec![
            ("path", self.path.clone()),
            ("nwid", self.network_id.clone()),
        ];
        lines.extend(spec.parameter_lines());
        let mut dump = String::from("\n");
        for (name, value) in &lines {
            dump.push_str(&format!("{name:<10}= {value}\n"));
        }
        let result = writeln!(self.out, "{dump}").map_err(HarnessError::Console);
        self.keep(result);

        let params: serde_json::Map<String, serde_json::Value> = lines
            .into_iter()
            .map(|(name, value)| (name.to_string(), serde_json::Value::String(value)))
            .collect();
        self.emit(
            |e| {
                e.with_spec(spec)
                    .with_details(serde_json::Value::Object(params))
            },
            LogLevel::Info,
            EVENT_RUN_START,
        );
    }

    pub fn run_finished(&mut self, report: &RunReport) {
        let verdict = &report.verdict;
        let mut text = format!("{}\n", verdict.label());
        for failure in &verdict.failures {
            text.push_str(&format!("  - {failure}\n"));
        }
        let result = self
            .err
            .write_all(text.as_bytes())
            .map_err(HarnessError::Console);
        self.keep(result);

        let level = if verdict.passed {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        self.emit(
            |e| {
                let mut e = e
                    .with_spec(&report.spec)
                    .with_outcome(Outcome::from_passed(verdict.passed))
                    .with_exit_code(verdict.exit_code())
                    .with_bytes(report.outcome.bytes_written, report.outcome.bytes_read)
                    .with_duration_ms(report.elapsed.as_millis() as u64)
                    .with_details(serde_json::json!({
                        "stages": report.stages,
                        "target": verdict.target,
                        "writes_issued": report.outcome.writes_issued,
                        "reads_issued": report.outcome.reads_issued,
                        "failures": verdict.failures,
                    }));
                if report.outcome.last_error != 0 {
                    e = e.with_errno(report.outcome.last_error);
                }
                e
            },
            level,
            EVENT_RUN_VERDICT,
        );
    }

    pub fn matrix_finished(&mut self, report: &MatrixReport) {
        let summary = format!(
            "comprehensive: {} of {} runs passed\n{}\n",
            report.runs.len() - report.failed_runs(),
            report.runs.len(),
            if report.passed { "PASSED" } else { "FAILED" }
        );
        let result = self
            .err
            .write_all(summary.as_bytes())
            .map_err(HarnessError::Console);
        self.keep(result);

        let total_ms: u64 = report
            .runs
            .iter()
            .map(|r| r.elapsed.as_millis() as u64)
            .sum();
        self.emit(
            |e| {
                e.with_outcome(Outcome::from_passed(report.passed))
                    .with_exit_code(report.exit_code())
                    .with_duration_ms(total_ms)
                    .with_details(serde_json::json!({
                        "runs": report.runs.len(),
                        "failed": report.failed_runs(),
                    }))
            },
            if report.passed {
                LogLevel::Info
            } else {
                LogLevel::Error
            },
            EVENT_MATRIX_VERDICT,
        );
    }

    /// A mode that cannot run at all.
    pub fn unsupported(&mut self, what: &str) {
        let result = writeln!(self.err, "{what} is not implemented\nFAILED")
            .map_err(HarnessError::Console);
        self.keep(result);
        self.emit(
            |e| {
                e.with_outcome(Outcome::Error)
                    .with_exit_code(sockprobe_core::verify::EXIT_FAIL)
                    .with_details(serde_json::json!({ "unsupported": what }))
            },
            LogLevel::Error,
            EVENT_RUN_VERDICT,
        );
    }

    /// Flush everything and report the first write failure, if any.
    pub fn finish(&mut self) -> Result<(), HarnessError> {
        if let Some(err) = self.first_error.take() {
            return Err(err);
        }
        self.out.flush().map_err(HarnessError::Console)?;
        self.err.flush().map_err(HarnessError::Console)?;
        if let Some(log) = self.log.as_mut() {
            log.flush().map_err(HarnessError::Log)?;
        }
        Ok(())
    }

    pub fn into_parts(self) -> (O, E, Option<LogEmitter>) {
        (self.out, self.err, self.log)
    }
}

impl<O: Write, E: Write> MatrixObserver for Reporter<O, E> {
    fn before_run(&mut self, step: &MatrixStep) {
        self.run_started(&step.spec);
    }

    fn after_run(&mut self, _step: &MatrixStep, report: &RunReport) {
        self.run_finished(report);
    }
}
