//! Error numbers reported by the socket API under test.
//!
//! Only the subset of `<errno.h>` that the transfer logic and the socket
//! simulator produce or inspect is listed here. Values match Linux. A host
//! backend reports the host's own numbers, so code that inspects host
//! errors compares against the `libc` constants instead.

use std::fmt;

use serde::Serialize;

pub const EBADF: i32 = 9;
pub const EIO: i32 = 5;
pub const EINVAL: i32 = 22;
pub const EPIPE: i32 = 32;
pub const EAFNOSUPPORT: i32 = 97;
pub const EADDRINUSE: i32 = 98;
pub const EADDRNOTAVAIL: i32 = 99;
pub const ECONNRESET: i32 = 104;
pub const EISCONN: i32 = 106;
pub const ENOTCONN: i32 = 107;
pub const ETIMEDOUT: i32 = 110;
pub const ECONNREFUSED: i32 = 111;

/// A raw errno value returned by a failing socket call.
///
/// Zero never appears inside an `Errno`; "no error" is represented by the
/// absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Errno(pub i32);

impl Errno {
    /// Raw numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Symbolic name for the codes this crate knows about.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            EIO => "EIO",
            EBADF => "EBADF",
            EINVAL => "EINVAL",
            EPIPE => "EPIPE",
            EAFNOSUPPORT => "EAFNOSUPPORT",
            EADDRINUSE => "EADDRINUSE",
            EADDRNOTAVAIL => "EADDRNOTAVAIL",
            ECONNRESET => "ECONNRESET",
            EISCONN => "EISCONN",
            ENOTCONN => "ENOTCONN",
            ETIMEDOUT => "ETIMEDOUT",
            ECONNREFUSED => "ECONNREFUSED",
            _ => return None,
        })
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<Errno> for i32 {
    fn from(value: Errno) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_symbol_when_known() {
        assert_eq!(Errno(ECONNREFUSED).to_string(), "111 (ECONNREFUSED)");
        assert_eq!(Errno(4242).to_string(), "4242");
    }

    #[test]
    fn code_round_trips_through_i32() {
        let raw: i32 = Errno(EPIPE).into();
        assert_eq!(raw, EPIPE);
        assert_eq!(Errno(EPIPE).code(), 32);
    }
}
