//! Test specification: what one run does.
//!
//! A [`TestSpec`] is built once per invocation and only read afterwards.
//! Every combination of role, family and transfer kind is a distinct enum
//! value, so the orchestration code matches on them exhaustively.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// Endpoint role. `client` and `server` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// The complementary role.
    #[must_use]
    pub const fn swapped(self) -> Self {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }

    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Initiator => "client",
            Self::Responder => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" | "initiator" => Ok(Self::Initiator),
            "server" | "responder" => Ok(Self::Responder),
            other => Err(format!("unknown role '{other}', expected client|server")),
        }
    }
}

/// Address family under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Protocol number as written on the command line.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ipv{}", self.number())
    }
}

impl FromStr for AddressFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4" | "ipv4" => Ok(Self::V4),
            "6" | "ipv6" => Ok(Self::V6),
            other => Err(format!("unknown protocol '{other}', expected 4|6")),
        }
    }
}

/// Rule that decides when a sustained transfer is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Exactly this many write/read exchanges of the payload.
    Iterations(u64),
    /// Exactly this many bytes in each direction.
    Bytes(u64),
    /// Run for this many seconds. Declared on the command line only.
    Duration(u64),
}

impl Completion {
    #[must_use]
    pub const fn operation_name(self) -> &'static str {
        match self {
            Self::Iterations(_) => "n_times",
            Self::Bytes(_) => "n_bytes",
            Self::Duration(_) => "n_seconds",
        }
    }

    #[must_use]
    pub const fn count(self) -> u64 {
        match self {
            Self::Iterations(n) | Self::Bytes(n) | Self::Duration(n) => n,
        }
    }
}

/// Traffic pattern of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transfer {
    /// One write and one read, echoed by the responder.
    OneShot,
    /// Repeated transfer until `completion` holds, pausing `delay` before
    /// every round.
    Sustained {
        completion: Completion,
        #[serde(serialize_with = "serialize_millis")]
        delay: Duration,
    },
}

impl Transfer {
    /// Name used in parameter dumps and logs.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::OneShot => "simple",
            Self::Sustained { .. } => "sustained",
        }
    }
}

fn serialize_millis<S: serde::Serializer>(delay: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(delay.as_millis() as u64)
}

/// Everything one orchestrator invocation needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSpec {
    pub role: Role,
    pub family: AddressFamily,
    pub transfer: Transfer,
    pub host: String,
    pub port: u16,
}

impl TestSpec {
    #[must_use]
    pub fn one_shot(role: Role, family: AddressFamily, host: impl Into<String>, port: u16) -> Self {
        Self {
            role,
            family,
            transfer: Transfer::OneShot,
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn sustained(
        role: Role,
        family: AddressFamily,
        host: impl Into<String>,
        port: u16,
        completion: Completion,
        delay: Duration,
    ) -> Self {
        Self {
            role,
            family,
            transfer: Transfer::Sustained { completion, delay },
            host: host.into(),
            port,
        }
    }

    /// Same run with the opposite role.
    #[must_use]
    pub fn with_role(&self, role: Role) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }

    /// `(name, value)` pairs describing every parameter, in the order they
    /// are printed before a run.
    #[must_use]
    pub fn parameter_lines(&self) -> Vec<(&'static str, String)> {
        let (operation, count, delay) = match self.transfer {
            Transfer::OneShot => ("-".to_string(), 0, 0),
            Transfer::Sustained { completion, delay } => (
                completion.operation_name().to_string(),
                completion.count(),
                delay.as_millis() as u64,
            ),
        };
        vec![
            ("type", self.transfer.type_name().to_string()),
            ("protocol", self.family.number().to_string()),
            ("mode", self.role.to_string()),
            ("ipstr", self.host.clone()),
            ("port", self.port.to_string()),
            ("operation", operation),
            ("n_count", count.to_string()),
            ("delay", delay.to_string()),
        ]
    }
}
