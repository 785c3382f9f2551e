//! `SocketAddr` to C `sockaddr` conversion.

use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Storage large enough for either family, passed to `connect`/`bind`.
#[repr(C)]
pub(crate) union RawSockAddr {
    v4: libc::sockaddr_in,
    v6: libc::sockaddr_in6,
}

pub(crate) struct SockAddrBuf {
    raw: RawSockAddr,
    len: libc::socklen_t,
}

impl SockAddrBuf {
    pub(crate) fn as_ptr(&self) -> *const libc::sockaddr {
        (&raw const self.raw).cast()
    }

    pub(crate) const fn len(&self) -> libc::socklen_t {
        self.len
    }
}

impl From<&SocketAddr> for SockAddrBuf {
    fn from(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => {
                // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
                let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
                sin.sin_family = libc::AF_INET as libc::sa_family_t;
                sin.sin_port = v4.port().to_be();
                sin.sin_addr.s_addr = u32::from_ne_bytes(v4.ip().octets());
                #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
                {
                    sin.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
                }
                Self {
                    raw: RawSockAddr { v4: sin },
                    len: mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                }
            }
            SocketAddr::V6(v6) => {
                // SAFETY: sockaddr_in6 is plain old data; all-zero is a valid value.
                let mut sin6: libc::sockaddr_in6 = unsafe { mem::zeroed() };
                sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                sin6.sin6_port = v6.port().to_be();
                sin6.sin6_flowinfo = v6.flowinfo();
                sin6.sin6_addr.s6_addr = v6.ip().octets();
                sin6.sin6_scope_id = v6.scope_id();
                #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
                {
                    sin6.sin6_len = mem::size_of::<libc::sockaddr_in6>() as u8;
                }
                Self {
                    raw: RawSockAddr { v6: sin6 },
                    len: mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                }
            }
        }
    }
}

/// Read the IP out of a kernel-supplied `sockaddr`, if it is IPv4 or IPv6.
///
/// # Safety
///
/// `sa` must be null or point to a valid `sockaddr` whose full
/// family-specific structure is readable.
pub(crate) unsafe fn ip_of(sa: *const libc::sockaddr) -> Option<IpAddr> {
    if sa.is_null() {
        return None;
    }
    // SAFETY: non-null and valid per the caller's contract.
    let family = i32::from(unsafe { (*sa).sa_family });
    match family {
        libc::AF_INET => {
            // SAFETY: family says this is a sockaddr_in.
            let sin = unsafe { &*sa.cast::<libc::sockaddr_in>() };
            Some(IpAddr::V4(Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes())))
        }
        libc::AF_INET6 => {
            // SAFETY: family says this is a sockaddr_in6.
            let sin6 = unsafe { &*sa.cast::<libc::sockaddr_in6>() };
            Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_port_and_address_are_in_network_order() {
        let buf = SockAddrBuf::from(&"10.1.2.3:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(buf.len() as usize, mem::size_of::<libc::sockaddr_in>());
        // SAFETY: built from a V4 address.
        let sin = unsafe { buf.raw.v4 };
        assert_eq!(sin.sin_port.to_ne_bytes(), 8080u16.to_be_bytes());
        assert_eq!(sin.sin_addr.s_addr.to_ne_bytes(), [10, 1, 2, 3]);
        // SAFETY: the pointer refers to a live sockaddr_in.
        assert_eq!(
            unsafe { ip_of(buf.as_ptr()) },
            Some(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)))
        );
    }

    #[test]
    fn v6_keeps_scope_id() {
        let addr = SocketAddr::V6(std::net::SocketAddrV6::new(
            "fe80::1".parse().unwrap(),
            9,
            0,
            3,
        ));
        let buf = SockAddrBuf::from(&addr);
        assert_eq!(buf.len() as usize, mem::size_of::<libc::sockaddr_in6>());
        // SAFETY: built from a V6 address.
        let sin6 = unsafe { buf.raw.v6 };
        assert_eq!(sin6.sin6_scope_id, 3);
        assert_eq!(i32::from(sin6.sin6_family), libc::AF_INET6);
    }

    #[test]
    fn null_sockaddr_has_no_ip() {
        // SAFETY: null is explicitly allowed.
        assert_eq!(unsafe { ip_of(std::ptr::null()) }, None);
    }
}
