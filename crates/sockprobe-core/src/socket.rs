//! Boundary to the socket implementation under test.
//!
//! The transfer logic never talks to the operating system directly. Every
//! call goes through [`SocketApi`], which mirrors the POSIX calls one to
//! one: a failing call yields the errno it reported and nothing else.
//! Implementations may restart a call interrupted by `EINTR` but must not
//! otherwise retry, and must not split or merge reads and writes.

use std::net::SocketAddr;

use crate::errno::Errno;
use crate::spec::AddressFamily;

/// Handle to a socket owned by the implementation under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(pub i32);

impl std::fmt::Display for Fd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

/// Stream-socket calls used by a run.
pub trait SocketApi {
    /// Create a stream socket for `family`.
    fn socket(&mut self, family: AddressFamily) -> Result<Fd, Errno>;

    fn connect(&mut self, fd: Fd, addr: &SocketAddr) -> Result<(), Errno>;

    fn bind(&mut self, fd: Fd, addr: &SocketAddr) -> Result<(), Errno>;

    fn listen(&mut self, fd: Fd, backlog: i32) -> Result<(), Errno>;

    /// Block until one peer connects and return its handle.
    fn accept(&mut self, fd: Fd) -> Result<Fd, Errno>;

    /// One blocking read. `Ok(0)` means the peer closed its side.
    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize, Errno>;

    /// One blocking write. May accept fewer bytes than offered.
    fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize, Errno>;

    fn close(&mut self, fd: Fd) -> Result<(), Errno>;
}

impl<A: SocketApi + ?Sized> SocketApi for &mut A {
    fn socket(&mut self, family: AddressFamily) -> Result<Fd, Errno> {
        (**self).socket(family)
    }

    fn connect(&mut self, fd: Fd, addr: &SocketAddr) -> Result<(), Errno> {
        (**self).connect(fd, addr)
    }

    fn bind(&mut self, fd: Fd, addr: &SocketAddr) -> Result<(), Errno> {
        (**self).bind(fd, addr)
    }

    fn listen(&mut self, fd: Fd, backlog: i32) -> Result<(), Errno> {
        (**self).listen(fd, backlog)
    }

    fn accept(&mut self, fd: Fd) -> Result<Fd, Errno> {
        (**self).accept(fd)
    }

    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize, Errno> {
        (**self).read(fd, buf)
    }

    fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize, Errno> {
        (**self).write(fd, buf)
    }

    fn close(&mut self, fd: Fd) -> Result<(), Errno> {
        (**self).close(fd)
    }
}
