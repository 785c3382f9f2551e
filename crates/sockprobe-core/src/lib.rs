//! # sockprobe-core
//!
//! Transfer logic for socket API conformance runs.
//!
//! This crate decides how many read/write operations a run issues, how
//! partial results are accumulated, when a transfer is complete, and how
//! the initiator and responder sides of a run are sequenced. The socket
//! implementation under test is reached only through [`SocketApi`]; the
//! host `libc` backend lives in the ABI crate. No `unsafe` code is
//! permitted at the crate level.

#![deny(unsafe_code)]

pub mod address;
pub mod barrier;
pub mod bootstrap;
pub mod engine;
pub mod errno;
pub mod error;
pub mod matrix;
pub mod orchestrator;
pub mod payload;
pub mod session;
pub mod sim;
pub mod socket;
pub mod spec;
pub mod verify;

pub use barrier::{Barrier, SleepBarrier};
pub use bootstrap::{BootstrapError, BootstrapOptions, BootstrapPhase, NetworkService};
pub use engine::{CompletionEngine, EngineOptions, TransferOutcome};
pub use errno::Errno;
pub use error::{IoDirection, TransferError};
pub use matrix::{MatrixObserver, MatrixPlan, MatrixReport, MatrixStep};
pub use orchestrator::{RunOptions, RunReport, Stage};
pub use payload::PayloadSpec;
pub use session::TransferSession;
pub use socket::{Fd, SocketApi};
pub use spec::{AddressFamily, Completion, Role, TestSpec, Transfer};
pub use verify::Verdict;
