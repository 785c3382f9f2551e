//! Bring the network service up before any run: start it, join the
//! network, wait for an address.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

/// Interval between readiness polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPhase {
    WaitingForService,
    JoiningNetwork,
    WaitingForAddress,
    Complete,
}

impl BootstrapPhase {
    /// Progress line printed when the phase begins.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::WaitingForService => "waiting for service to start...",
            Self::JoiningNetwork => "joining network...",
            Self::WaitingForAddress => "waiting for address assignment...",
            Self::Complete => "complete",
        }
    }
}

/// The network stack the socket calls go through.
pub trait NetworkService {
    /// Start the service with its storage at `path`.
    fn start(&mut self, path: &Path) -> std::io::Result<()>;
    fn is_running(&self) -> bool;
    fn join(&mut self, network_id: &str) -> std::io::Result<()>;
    /// True once an address on `network_id` has been assigned.
    fn has_address(&self, network_id: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to start service at {path}: {source}")]
    Start {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to join network {network_id}: {source}")]
    Join {
        network_id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("gave up {phase:?} after {waited:?}")]
    TimedOut {
        phase: BootstrapPhase,
        waited: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub poll: Duration,
    /// Give up a polling phase after this long; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            poll: POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Start, join, and wait for an address, reporting each phase to
/// `observer` as it begins.
pub fn bootstrap<S, F>(
    service: &mut S,
    path: &Path,
    network_id: &str,
    options: &BootstrapOptions,
    mut observer: F,
) -> Result<(), BootstrapError>
where
    S: NetworkService + ?Sized,
    F: FnMut(BootstrapPhase),
{
    observer(BootstrapPhase::WaitingForService);
    service.start(path).map_err(|source| BootstrapError::Start {
        path: path.to_path_buf(),
        source,
    })?;
    poll_until(options, BootstrapPhase::WaitingForService, || {
        service.is_running()
    })?;

    observer(BootstrapPhase::JoiningNetwork);
    service
        .join(network_id)
        .map_err(|source| BootstrapError::Join {
            network_id: network_id.to_string(),
            source,
        })?;

    observer(BootstrapPhase::WaitingForAddress);
    poll_until(options, BootstrapPhase::WaitingForAddress, || {
        service.has_address(network_id)
    })?;

    observer(BootstrapPhase::Complete);
    Ok(())
}

fn poll_until(
    options: &BootstrapOptions,
    phase: BootstrapPhase,
    mut ready: impl FnMut() -> bool,
) -> Result<(), BootstrapError> {
    let started = Instant::now();
    while !ready() {
        let waited = started.elapsed();
        if options.timeout.is_some_and(|limit| waited >= limit) {
            return Err(BootstrapError::TimedOut { phase, waited });
        }
        std::thread::sleep(options.poll);
    }
    Ok(())
}
