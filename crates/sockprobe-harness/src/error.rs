use sockprobe_core::BootstrapError;
use thiserror::Error;

/// Failures of the harness itself, as opposed to failed runs.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("structured log write failed: {0}")]
    Log(#[source] std::io::Error),
    #[error("console write failed: {0}")]
    Console(#[source] std::io::Error),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}
