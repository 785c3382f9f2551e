//! Completion engine: drives reads and writes on one session until the
//! transfer's completion rule holds.
//!
//! Accumulators advance only on successful returns. A failed read or
//! write sets `last_error` and the loop carries on; the verdict at the
//! end decides whether the run passed. Reads and writes are issued
//! strictly one after the other, initiator writing first and responder
//! reading first.

use std::time::Duration;

use serde::Serialize;

use crate::errno::{ECONNRESET, Errno};
use crate::error::TransferError;
use crate::payload::PayloadSpec;
use crate::session::TransferSession;
use crate::socket::SocketApi;
use crate::spec::{Completion, Role, Transfer};

/// Largest single read or write request in byte-count mode.
pub const CHUNK: usize = 16 * 1024;

/// Responder read buffer for one-shot runs when the payload is shorter.
pub const ONE_SHOT_READ_BUF: usize = 32;

/// Consecutive no-progress rounds tolerated in byte-count mode.
pub const DEFAULT_STALL_LIMIT: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Byte-count rounds in a row without progress before giving up.
    /// Zero disables the guard.
    pub stall_limit: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            stall_limit: DEFAULT_STALL_LIMIT,
        }
    }
}

/// Result of driving one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub bytes_written: u64,
    pub bytes_read: u64,
    /// Errno of the most recent failure, 0 if none.
    pub last_error: i32,
    #[serde(skip)]
    pub last_received: Vec<u8>,
    pub writes_issued: u64,
    pub reads_issued: u64,
    pub io_errors: u64,
    /// Set when the run ended before the transfer could start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<TransferError>,
}

impl TransferOutcome {
    /// Outcome of a run that never reached the transfer.
    #[must_use]
    pub fn from_setup_error(err: TransferError) -> Self {
        Self {
            last_error: err.errno().map_or(0, Errno::code),
            setup_error: Some(err),
            ..Self::default()
        }
    }

    fn record_error(&mut self, err: Errno) {
        self.io_errors += 1;
        self.last_error = err.code();
    }

    fn record_write(&mut self, result: Result<usize, Errno>) -> usize {
        self.writes_issued += 1;
        match result {
            Ok(n) => {
                self.bytes_written += n as u64;
                n
            }
            Err(err) => {
                self.record_error(err);
                0
            }
        }
    }

    fn record_read(&mut self, result: Result<usize, Errno>, buf: &[u8]) -> usize {
        self.reads_issued += 1;
        match result {
            Ok(n) => {
                self.bytes_read += n as u64;
                if n > 0 {
                    self.last_received.clear();
                    self.last_received.extend_from_slice(&buf[..n]);
                }
                n
            }
            Err(err) => {
                self.record_error(err);
                0
            }
        }
    }
}

/// Drives one established session for one role.
pub struct CompletionEngine<'a, A: SocketApi> {
    session: &'a mut TransferSession<A>,
    payload: &'a PayloadSpec,
    options: EngineOptions,
    outcome: TransferOutcome,
}

impl<'a, A: SocketApi> CompletionEngine<'a, A> {
    pub fn new(
        session: &'a mut TransferSession<A>,
        payload: &'a PayloadSpec,
        options: EngineOptions,
    ) -> Self {
        Self {
            session,
            payload,
            options,
            outcome: TransferOutcome::default(),
        }
    }

    /// Run the transfer to completion.
    ///
    /// Only an unsupported completion kind is returned as an error, before
    /// any I/O; transfer failures are folded into the outcome.
    pub fn run(mut self, role: Role, transfer: Transfer) -> Result<TransferOutcome, TransferError> {
        match transfer {
            Transfer::OneShot => self.one_shot(role),
            Transfer::Sustained { completion, delay } => match completion {
                Completion::Iterations(n) => self.iterations(role, n, delay),
                Completion::Bytes(b) => self.bytes(role, b, delay),
                Completion::Duration(_) => {
                    return Err(TransferError::UnsupportedMode("n_seconds"));
                }
            },
        }
        Ok(self.outcome)
    }

    fn one_shot(&mut self, role: Role) {
        match role {
            Role::Initiator => {
                self.write_payload();
                self.read_into(self.payload.len());
            }
            Role::Responder => {
                let received = self.read_into(self.payload.len().max(ONE_SHOT_READ_BUF));
                self.echo(received);
            }
        }
    }

    fn iterations(&mut self, role: Role, count: u64, delay: Duration) {
        let len = self.payload.len();
        for _ in 0..count {
            pace(delay);
            match role {
                Role::Initiator => {
                    self.write_payload();
                    self.read_into(len);
                }
                Role::Responder => {
                    let received = self.read_into(len);
                    self.echo(received);
                }
            }
        }
    }

    fn bytes(&mut self, role: Role, target: u64, delay: Duration) {
        let window = usize::try_from(target).map_or(CHUNK, |t| t.min(CHUNK));
        let mut wbuf = vec![0u8; window];
        let mut rbuf = vec![0u8; window];
        let mut stalled = 0u32;

        while self.outcome.bytes_written < target || self.outcome.bytes_read < target {
            pace(delay);
            let before = (self.outcome.bytes_written, self.outcome.bytes_read);
            match role {
                Role::Initiator => {
                    self.write_stream(target, &mut wbuf);
                    self.read_stream(target, &mut rbuf);
                }
                Role::Responder => {
                    self.read_stream(target, &mut rbuf);
                    self.write_stream(target, &mut wbuf);
                }
            }

            if before == (self.outcome.bytes_written, self.outcome.bytes_read) {
                stalled += 1;
                if self.options.stall_limit != 0 && stalled >= self.options.stall_limit {
                    if self.outcome.last_error == 0 {
                        self.outcome.last_error = ECONNRESET;
                    }
                    break;
                }
            } else {
                stalled = 0;
            }
        }
    }

    fn write_payload(&mut self) {
        let result = self.session.write_some(self.payload.as_bytes());
        self.outcome.record_write(result);
    }

    /// One read of up to `len` bytes. Returns the bytes received.
    fn read_into(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        let result = self.session.read_some(&mut buf);
        let n = self.outcome.record_read(result, &buf);
        buf.truncate(n);
        buf
    }

    /// Write back exactly what was received; nothing to do for an empty read.
    fn echo(&mut self, received: Vec<u8>) {
        if received.is_empty() {
            return;
        }
        let result = self.session.write_some(&received);
        self.outcome.record_write(result);
    }

    fn write_stream(&mut self, target: u64, wbuf: &mut [u8]) {
        let written = self.outcome.bytes_written;
        if written >= target {
            return;
        }
        let n = remaining_request(target, written, wbuf.len());
        self.payload.fill_stream(written, &mut wbuf[..n]);
        let result = self.session.write_some(&wbuf[..n]);
        self.outcome.record_write(result);
    }

    fn read_stream(&mut self, target: u64, rbuf: &mut [u8]) {
        let read = self.outcome.bytes_read;
        if read >= target {
            return;
        }
        let n = remaining_request(target, read, rbuf.len());
        let result = self.session.read_some(&mut rbuf[..n]);
        self.outcome.record_read(result, &rbuf[..n]);
    }
}

/// Request size that cannot carry an accumulator past `target`.
fn remaining_request(target: u64, done: u64, window: usize) -> usize {
    usize::try_from(target - done).map_or(window, |left| left.min(window))
}

fn pace(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}
