//! One complete run for one role: resolve, acquire, transfer, close,
//! verify.
//!
//! Stage trail:
//!
//! ```text
//! initiator: Init -> AddressResolved -> SocketAcquired -> TransferRunning -> Closed
//! responder: Init -> AddressResolved -> Listening -> SocketAcquired -> TransferRunning -> Closed
//! ```
//!
//! A setup failure jumps straight to `Closed` after releasing whatever the
//! run had acquired.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::address;
use crate::engine::{CompletionEngine, EngineOptions, TransferOutcome};
use crate::error::TransferError;
use crate::payload::PayloadSpec;
use crate::session::TransferSession;
use crate::socket::SocketApi;
use crate::spec::{Completion, Role, TestSpec, Transfer};
use crate::verify::{self, Verdict};

/// Listen backlog for one-shot responders.
pub const ONE_SHOT_BACKLOG: i32 = 100;
/// Listen backlog for sustained responders.
pub const SUSTAINED_BACKLOG: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    AddressResolved,
    Listening,
    SocketAcquired,
    TransferRunning,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub engine: EngineOptions,
    /// Overrides the backlog chosen from the transfer kind.
    pub backlog: Option<i32>,
}

impl RunOptions {
    #[must_use]
    pub fn backlog_for(&self, transfer: Transfer) -> i32 {
        self.backlog.unwrap_or(match transfer {
            Transfer::OneShot => ONE_SHOT_BACKLOG,
            Transfer::Sustained { .. } => SUSTAINED_BACKLOG,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub spec: TestSpec,
    pub stages: Vec<Stage>,
    pub outcome: TransferOutcome,
    pub verdict: Verdict,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl RunReport {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.verdict.passed
    }
}

/// Execute `spec` against `api` and return the verdict.
///
/// Blocks for as long as the transfer takes; a responder blocks in accept
/// until a peer connects.
pub fn run<A: SocketApi>(
    api: A,
    spec: &TestSpec,
    payload: &PayloadSpec,
    options: &RunOptions,
) -> RunReport {
    let started = Instant::now();
    let mut stages = vec![Stage::Init];
    let outcome = match drive(api, spec, payload, options, &mut stages) {
        Ok(outcome) => outcome,
        Err(err) => TransferOutcome::from_setup_error(err),
    };
    stages.push(Stage::Closed);
    let verdict = verify::verify(&outcome, spec.transfer, payload);
    RunReport {
        spec: spec.clone(),
        stages,
        outcome,
        verdict,
        elapsed: started.elapsed(),
    }
}

fn drive<A: SocketApi>(
    api: A,
    spec: &TestSpec,
    payload: &PayloadSpec,
    options: &RunOptions,
    stages: &mut Vec<Stage>,
) -> Result<TransferOutcome, TransferError> {
    if let Transfer::Sustained {
        completion: Completion::Duration(_),
        ..
    } = spec.transfer
    {
        return Err(TransferError::UnsupportedMode("n_seconds"));
    }

    let addr = address::select(spec.family, &spec.host, spec.port, spec.role)?;
    stages.push(Stage::AddressResolved);

    let mut session = match spec.role {
        Role::Initiator => TransferSession::open_initiator(api, &addr)?,
        Role::Responder => {
            let mut session = TransferSession::new_responder(api);
            let listener = session.listen(&addr, options.backlog_for(spec.transfer))?;
            stages.push(Stage::Listening);
            session.accept_peer(listener)?;
            session
        }
    };
    stages.push(Stage::SocketAcquired);

    stages.push(Stage::TransferRunning);
    let mut outcome =
        CompletionEngine::new(&mut session, payload, options.engine).run(spec.role, spec.transfer)?;
    if let Err(err) = session.close() {
        outcome.last_error = err.code();
    }
    Ok(outcome)
}

fn serialize_millis<S: serde::Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(elapsed.as_millis() as u64)
}
