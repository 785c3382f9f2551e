//! Error taxonomy for a single run.
//!
//! Setup failures (socket creation, connect, bind, listen, accept, name
//! resolution) end the run. `IoFailed` is recorded by the completion
//! engine but never ends a transfer loop on its own.

use serde::Serialize;
use thiserror::Error;

use crate::errno::Errno;

/// Direction of a failed transfer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IoDirection {
    Read,
    Write,
}

impl std::fmt::Display for IoDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransferError {
    #[error("error creating socket (errno {code})")]
    SocketCreateFailed { code: Errno },
    #[error("error connecting to remote host (errno {code})")]
    ConnectFailed { code: Errno },
    #[error("error binding to interface (errno {code})")]
    BindFailed { code: Errno },
    #[error("error placing socket in LISTENING state (errno {code})")]
    ListenFailed { code: Errno },
    #[error("error accepting connection (errno {code})")]
    AcceptFailed { code: Errno },
    #[error("{direction} failed (errno {code})")]
    IoFailed { direction: IoDirection, code: Errno },
    #[error("no such host: {host}")]
    ResolutionFailed { host: String },
    #[error("{0} is not implemented")]
    UnsupportedMode(&'static str),
}

impl TransferError {
    /// Errno carried by the error, if any.
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::SocketCreateFailed { code }
            | Self::ConnectFailed { code }
            | Self::BindFailed { code }
            | Self::ListenFailed { code }
            | Self::AcceptFailed { code }
            | Self::IoFailed { code, .. } => Some(*code),
            Self::ResolutionFailed { .. } | Self::UnsupportedMode(_) => None,
        }
    }

    /// True for failures that end a run before any transfer happens.
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        !matches!(self, Self::IoFailed { .. })
    }
}
