//! `SocketApi` over the host's libc sockets.

use std::ffi::c_int;
use std::net::SocketAddr;

use sockprobe_core::errno::Errno;
use sockprobe_core::{AddressFamily, Fd, SocketApi};

use crate::sockaddr::SockAddrBuf;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = 0;

#[inline]
fn last_host_errno() -> Errno {
    Errno(
        std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO),
    )
}

#[inline]
fn check_int(rc: c_int) -> Result<c_int, Errno> {
    if rc < 0 { Err(last_host_errno()) } else { Ok(rc) }
}

#[inline]
fn check_size(rc: isize) -> Result<usize, Errno> {
    if rc < 0 {
        Err(last_host_errno())
    } else {
        Ok(rc as usize)
    }
}

/// Repeat `call` while it fails with `EINTR`.
fn retry_eintr<T>(mut call: impl FnMut() -> Result<T, Errno>) -> Result<T, Errno> {
    loop {
        match call() {
            Err(Errno(libc::EINTR)) => continue,
            other => return other,
        }
    }
}

/// Blocking stream sockets from the host C library.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSocketApi;

impl HostSocketApi {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SocketApi for HostSocketApi {
    fn socket(&mut self, family: AddressFamily) -> Result<Fd, Errno> {
        let domain = match family {
            AddressFamily::V4 => libc::AF_INET,
            AddressFamily::V6 => libc::AF_INET6,
        };
        // SAFETY: no pointers are passed.
        check_int(unsafe { libc::socket(domain, libc::SOCK_STREAM, 0) }).map(Fd)
    }

    fn connect(&mut self, fd: Fd, addr: &SocketAddr) -> Result<(), Errno> {
        let raw = SockAddrBuf::from(addr);
        // SAFETY: `raw` outlives the call and `len` matches its family.
        check_int(unsafe { libc::connect(fd.0, raw.as_ptr(), raw.len()) }).map(drop)
    }

    fn bind(&mut self, fd: Fd, addr: &SocketAddr) -> Result<(), Errno> {
        let one: c_int = 1;
        // SAFETY: `one` is a live c_int and the length matches.
        check_int(unsafe {
            libc::setsockopt(
                fd.0,
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                (&raw const one).cast(),
                std::mem::size_of::<c_int>() as libc::socklen_t,
            )
        })?;
        let raw = SockAddrBuf::from(addr);
        // SAFETY: `raw` outlives the call and `len` matches its family.
        check_int(unsafe { libc::bind(fd.0, raw.as_ptr(), raw.len()) }).map(drop)
    }

    fn listen(&mut self, fd: Fd, backlog: i32) -> Result<(), Errno> {
        // SAFETY: no pointers are passed.
        check_int(unsafe { libc::listen(fd.0, backlog) }).map(drop)
    }

    fn accept(&mut self, fd: Fd) -> Result<Fd, Errno> {
        retry_eintr(|| {
            // SAFETY: null address out-parameters are allowed.
            check_int(unsafe { libc::accept(fd.0, std::ptr::null_mut(), std::ptr::null_mut()) })
        })
        .map(Fd)
    }

    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize, Errno> {
        retry_eintr(|| {
            // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
            check_size(unsafe { libc::read(fd.0, buf.as_mut_ptr().cast(), buf.len()) })
        })
    }

    fn write(&mut self, fd: Fd, bytes: &[u8]) -> Result<usize, Errno> {
        retry_eintr(|| {
            // SAFETY: `bytes` is valid for reads of `bytes.len()` bytes.
            check_size(unsafe { libc::send(fd.0, bytes.as_ptr().cast(), bytes.len(), SEND_FLAGS) })
        })
    }

    fn close(&mut self, fd: Fd) -> Result<(), Errno> {
        // SAFETY: the session closes each handle it owns exactly once.
        check_int(unsafe { libc::close(fd.0) }).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_an_invalid_handle_reports_ebadf() {
        let mut api = HostSocketApi::new();
        assert_eq!(api.close(Fd(-1)), Err(Errno(libc::EBADF)));
    }

    #[test]
    fn socket_handles_are_real_descriptors() {
        let mut api = HostSocketApi::new();
        let fd = api.socket(AddressFamily::V4).unwrap();
        assert!(fd.0 >= 0);
        assert_eq!(api.close(fd), Ok(()));
    }

    #[test]
    fn refused_connect_reports_the_host_errno() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .unwrap()
            .port();
        let mut api = HostSocketApi::new();
        let fd = api.socket(AddressFamily::V4).unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        assert_eq!(api.connect(fd, &addr), Err(Errno(libc::ECONNREFUSED)));
        api.close(fd).unwrap();
    }

    #[test]
    fn io_on_unconnected_socket_fails() {
        let mut api = HostSocketApi::new();
        let fd = api.socket(AddressFamily::V4).unwrap();
        assert!(api.write(fd, b"x").is_err());
        api.close(fd).unwrap();
    }
}
