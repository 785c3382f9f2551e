//! PASS/FAIL decision for one run.

use serde::Serialize;

use crate::engine::TransferOutcome;
use crate::payload::PayloadSpec;
use crate::spec::{Completion, Transfer};

/// Process exit code for a passing run.
pub const EXIT_PASS: i32 = 0;
/// Process exit code for a failing run.
pub const EXIT_FAIL: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    /// Bytes expected in each direction; `None` when the transfer kind has
    /// no byte target.
    pub target: Option<u64>,
    /// One line per failed check, empty on PASS.
    pub failures: Vec<String>,
}

impl Verdict {
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.passed { EXIT_PASS } else { EXIT_FAIL }
    }

    /// `PASSED` or `FAILED`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        if self.passed { "PASSED" } else { "FAILED" }
    }
}

/// Bytes each direction must carry for `transfer` to be complete.
#[must_use]
pub fn expected_total(transfer: Transfer, payload_len: usize) -> Option<u64> {
    let len = payload_len as u64;
    match transfer {
        Transfer::OneShot => Some(len),
        Transfer::Sustained { completion, .. } => match completion {
            Completion::Iterations(n) => n.checked_mul(len),
            Completion::Bytes(b) => Some(b),
            Completion::Duration(_) => None,
        },
    }
}

/// Check every completion rule and collect the ones that failed.
#[must_use]
pub fn verify(outcome: &TransferOutcome, transfer: Transfer, payload: &PayloadSpec) -> Verdict {
    let target = expected_total(transfer, payload.len());
    let mut failures = Vec::new();

    if let Some(err) = &outcome.setup_error {
        failures.push(format!("setup failed: {err}"));
    }
    match target {
        Some(target) => {
            if outcome.bytes_written != target {
                failures.push(format!(
                    "bytes_written={} expected {target}",
                    outcome.bytes_written
                ));
            }
            if outcome.bytes_read != target {
                failures.push(format!("bytes_read={} expected {target}", outcome.bytes_read));
            }
        }
        None => failures.push("transfer kind has no byte target".to_string()),
    }
    if outcome.last_error != 0 {
        failures.push(format!("last_error={}", outcome.last_error));
    }

    let checks_content = matches!(
        transfer,
        Transfer::OneShot
            | Transfer::Sustained {
                completion: Completion::Iterations(_),
                ..
            }
    );
    // Zero iterations never receive anything to compare.
    if checks_content && target != Some(0) && outcome.last_received != payload.as_bytes() {
        failures.push(format!(
            "received {:?} expected {:?}",
            String::from_utf8_lossy(&outcome.last_received),
            String::from_utf8_lossy(payload.as_bytes())
        ));
    }

    Verdict {
        passed: failures.is_empty(),
        target,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno::{ECONNREFUSED, Errno};
    use crate::error::TransferError;
    use std::time::Duration;

    fn clean(total: u64, received: &[u8]) -> TransferOutcome {
        TransferOutcome {
            bytes_written: total,
            bytes_read: total,
            last_received: received.to_vec(),
            ..TransferOutcome::default()
        }
    }

    fn iterations(n: u64) -> Transfer {
        Transfer::Sustained {
            completion: Completion::Iterations(n),
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn one_shot_echo_passes() {
        let payload = PayloadSpec::default();
        let verdict = verify(&clean(22, payload.as_bytes()), Transfer::OneShot, &payload);
        assert!(verdict.passed, "{:?}", verdict.failures);
        assert_eq!(verdict.exit_code(), 0);
        assert_eq!(verdict.label(), "PASSED");
    }

    #[test]
    fn iteration_target_is_count_times_length() {
        let payload = PayloadSpec::default();
        assert_eq!(expected_total(iterations(100), payload.len()), Some(2200));
        let verdict = verify(&clean(2200, payload.as_bytes()), iterations(100), &payload);
        assert!(verdict.passed);
    }

    #[test]
    fn wrong_content_fails_even_with_exact_totals() {
        let payload = PayloadSpec::default();
        let verdict = verify(&clean(22, b"welcome to the muchine"), Transfer::OneShot, &payload);
        assert!(!verdict.passed);
        assert_eq!(verdict.exit_code(), 1);
        assert_eq!(verdict.failures.len(), 1);
    }

    #[test]
    fn byte_mode_ignores_content() {
        let payload = PayloadSpec::default();
        let transfer = Transfer::Sustained {
            completion: Completion::Bytes(100),
            delay: Duration::ZERO,
        };
        assert!(verify(&clean(100, b"tail"), transfer, &payload).passed);
    }

    #[test]
    fn zero_targets_pass_without_traffic() {
        let payload = PayloadSpec::default();
        let bytes = Transfer::Sustained {
            completion: Completion::Bytes(0),
            delay: Duration::ZERO,
        };
        assert!(verify(&TransferOutcome::default(), bytes, &payload).passed);
        assert!(verify(&TransferOutcome::default(), iterations(0), &payload).passed);
    }

    #[test]
    fn setup_failure_lists_every_failed_check() {
        let payload = PayloadSpec::default();
        let outcome = TransferOutcome::from_setup_error(TransferError::ConnectFailed {
            code: Errno(ECONNREFUSED),
        });
        let verdict = verify(&outcome, Transfer::OneShot, &payload);
        assert!(!verdict.passed);
        // setup, written, read, last_error, content
        assert_eq!(verdict.failures.len(), 5);
        assert!(verdict.failures[0].contains("connecting"));
    }

    #[test]
    fn recorded_error_fails_a_complete_transfer() {
        let payload = PayloadSpec::default();
        let mut outcome = clean(22, payload.as_bytes());
        outcome.last_error = 5;
        assert!(!verify(&outcome, Transfer::OneShot, &payload).passed);
    }

    #[test]
    fn duration_has_no_target() {
        let transfer = Transfer::Sustained {
            completion: Completion::Duration(3),
            delay: Duration::ZERO,
        };
        assert_eq!(expected_total(transfer, 22), None);
        let verdict = verify(&TransferOutcome::default(), transfer, &PayloadSpec::default());
        assert!(!verdict.passed);
    }
}
