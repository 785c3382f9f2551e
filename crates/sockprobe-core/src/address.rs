//! Endpoint address selection.
//!
//! IPv4 text must be a strict dotted quad; there is no name lookup, and
//! anything else (including the short, hex and octal forms `inet_addr`
//! would accept) becomes `INADDR_NONE` (`255.255.255.255`), so the
//! failure shows up at the connect or bind that follows. IPv6 text goes through name resolution and only IPv6
//! results are accepted.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6, ToSocketAddrs};

use crate::error::TransferError;
use crate::spec::{AddressFamily, Role};

/// Returned for IPv4 text that does not parse.
pub const INADDR_NONE: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Build the address a run connects to (initiator) or binds to
/// (responder). Both roles use the host the caller supplied.
pub fn select(
    family: AddressFamily,
    host: &str,
    port: u16,
    _role: Role,
) -> Result<SocketAddr, TransferError> {
    match family {
        AddressFamily::V4 => Ok(SocketAddr::new(IpAddr::V4(parse_v4(host)), port)),
        AddressFamily::V6 => resolve_v6(host, port).map(SocketAddr::V6),
    }
}

/// Strict dotted-quad parse, `INADDR_NONE` otherwise.
#[must_use]
pub fn parse_v4(host: &str) -> Ipv4Addr {
    host.trim().parse().unwrap_or(INADDR_NONE)
}

fn resolve_v6(host: &str, port: u16) -> Result<SocketAddrV6, TransferError> {
    let trimmed = host.trim().trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = trimmed.parse::<Ipv6Addr>() {
        return Ok(SocketAddrV6::new(ip, port, 0, 0));
    }
    let failed = || TransferError::ResolutionFailed {
        host: host.to_string(),
    };
    let candidates = (trimmed, port).to_socket_addrs().map_err(|_| failed())?;
    candidates
        .filter_map(|addr| match addr {
            SocketAddr::V6(v6) => Some(v6),
            SocketAddr::V4(_) => None,
        })
        .next()
        .ok_or_else(failed)
}
