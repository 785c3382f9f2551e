//! Deterministic in-memory socket API.
//!
//! A [`SimNetwork`] is one shared address space; each [`SimSocketApi`]
//! obtained from it plays one process. Endpoints on different threads can
//! connect to each other, and blocking calls (`accept`, `read`) wait on a
//! condition variable until data arrives, the peer closes, or the block
//! timeout elapses (`ETIMEDOUT`). Every call an endpoint makes is
//! recorded so tests can assert on exactly what was attempted.
//!
//! Echo listeners ([`SimNetwork::echo_listener`]) answer every connection
//! with a peer that writes back whatever it receives, which lets an
//! initiator run without a second thread.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::errno::{
    EADDRINUSE, EADDRNOTAVAIL, EAFNOSUPPORT, EBADF, ECONNREFUSED, EINVAL, EIO, EISCONN, ENOTCONN,
    EPIPE, ETIMEDOUT, Errno,
};
use crate::socket::{Fd, SocketApi};
use crate::spec::AddressFamily;

/// Default bound on how long `accept` and `read` block.
pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// First handle number handed out, after stdin/stdout/stderr.
const FIRST_FD: i32 = 3;

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    Socket(AddressFamily),
    Connect(Fd, SocketAddr),
    Bind(Fd, SocketAddr),
    Listen(Fd, i32),
    Accept(Fd),
    /// Handle and requested length.
    Read(Fd, usize),
    /// Handle and offered length.
    Write(Fd, usize),
    Close(Fd),
}

/// Failures and limits injected into one endpoint.
#[derive(Debug, Clone, Default)]
pub struct SimFaults {
    /// Every `socket` call fails with this errno.
    pub socket_error: Option<Errno>,
    /// Every `listen` call fails with this errno.
    pub listen_error: Option<Errno>,
    /// Cap on bytes moved by a single read or write.
    pub io_chunk: Option<usize>,
    /// The next this-many writes fail with `EIO`.
    pub failing_writes: u32,
    /// The next this-many reads fail with `EIO`.
    pub failing_reads: u32,
}

#[derive(Debug)]
enum SimSocket {
    Fresh {
        family: AddressFamily,
    },
    Bound {
        addr: SocketAddr,
    },
    Listening {
        addr: SocketAddr,
        pending: VecDeque<Fd>,
    },
    Connected {
        peer: Fd,
        inbound: VecDeque<u8>,
        peer_closed: bool,
        echo: bool,
    },
}

#[derive(Debug)]
struct NetState {
    next_fd: i32,
    sockets: HashMap<Fd, SimSocket>,
    bound: HashMap<SocketAddr, Fd>,
    echo_addrs: HashSet<SocketAddr>,
    bad_closes: usize,
}

impl NetState {
    fn allocate(&mut self, socket: SimSocket) -> Fd {
        let fd = Fd(self.next_fd);
        self.next_fd += 1;
        self.sockets.insert(fd, socket);
        fd
    }

    fn listener_for(&self, addr: &SocketAddr) -> Option<Fd> {
        if let Some(fd) = self.bound.get(addr) {
            return Some(*fd);
        }
        self.bound
            .iter()
            .find(|(bound, _)| {
                bound.port() == addr.port()
                    && bound.ip().is_unspecified()
                    && bound.is_ipv4() == addr.is_ipv4()
            })
            .map(|(_, fd)| *fd)
    }

    fn mark_peer_closed(&mut self, peer: Fd) {
        if let Some(SimSocket::Connected { peer_closed, .. }) = self.sockets.get_mut(&peer) {
            *peer_closed = true;
        }
    }
}

struct Shared {
    state: Mutex<NetState>,
    wake: Condvar,
    block_timeout: Duration,
}

/// Shared in-memory address space.
#[derive(Clone)]
pub struct SimNetwork {
    shared: Arc<Shared>,
}

impl Default for SimNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl SimNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::with_block_timeout(DEFAULT_BLOCK_TIMEOUT)
    }

    #[must_use]
    pub fn with_block_timeout(block_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(NetState {
                    next_fd: FIRST_FD,
                    sockets: HashMap::new(),
                    bound: HashMap::new(),
                    echo_addrs: HashSet::new(),
                    bad_closes: 0,
                }),
                wake: Condvar::new(),
                block_timeout,
            }),
        }
    }

    /// A new endpoint with no injected faults.
    #[must_use]
    pub fn endpoint(&self) -> SimSocketApi {
        self.endpoint_with(SimFaults::default())
    }

    #[must_use]
    pub fn endpoint_with(&self, faults: SimFaults) -> SimSocketApi {
        SimSocketApi {
            shared: Arc::clone(&self.shared),
            faults,
            calls: Vec::new(),
        }
    }

    /// Accept every connection to `addr` with a peer that echoes writes.
    pub fn echo_listener(&self, addr: SocketAddr) {
        self.shared.state.lock().echo_addrs.insert(addr);
    }

    /// Number of `close` calls on handles that did not exist.
    #[must_use]
    pub fn bad_close_count(&self) -> usize {
        self.shared.state.lock().bad_closes
    }

    /// True once some endpoint is listening on `addr`.
    #[must_use]
    pub fn is_listening(&self, addr: &SocketAddr) -> bool {
        let state = self.shared.state.lock();
        state
            .bound
            .get(addr)
            .is_some_and(|fd| matches!(state.sockets.get(fd), Some(SimSocket::Listening { .. })))
    }

    /// Block until some endpoint listens on `addr`, or the block timeout
    /// passes. Returns whether it is listening.
    pub fn wait_listening(&self, addr: &SocketAddr) -> bool {
        let deadline = Instant::now() + self.shared.block_timeout;
        while !self.is_listening(addr) {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Number of sockets currently open across all endpoints.
    #[must_use]
    pub fn open_sockets(&self) -> usize {
        self.shared
            .state
            .lock()
            .sockets
            .values()
            .filter(|s| !matches!(s, SimSocket::Connected { echo: true, .. }))
            .count()
    }
}

/// One simulated process's view of a [`SimNetwork`].
pub struct SimSocketApi {
    shared: Arc<Shared>,
    faults: SimFaults,
    calls: Vec<SimCall>,
}

impl SimSocketApi {
    /// Every call made through this endpoint, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SimCall> {
        self.calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, NetState> {
        self.shared.state.lock()
    }

    fn chunk(&self, len: usize) -> usize {
        self.faults.io_chunk.map_or(len, |cap| len.min(cap))
    }
}

fn family_matches(family: AddressFamily, addr: &SocketAddr) -> bool {
    matches!(
        (family, addr),
        (AddressFamily::V4, SocketAddr::V4(_)) | (AddressFamily::V6, SocketAddr::V6(_))
    )
}

fn is_broadcast(addr: &SocketAddr) -> bool {
    matches!(addr.ip(), IpAddr::V4(ip) if ip.is_broadcast())
}

impl SocketApi for SimSocketApi {
    fn socket(&mut self, family: AddressFamily) -> Result<Fd, Errno> {
        self.calls.push(SimCall::Socket(family));
        if let Some(err) = self.faults.socket_error {
            return Err(err);
        }
        Ok(self.lock().allocate(SimSocket::Fresh { family }))
    }

    fn connect(&mut self, fd: Fd, addr: &SocketAddr) -> Result<(), Errno> {
        self.calls.push(SimCall::Connect(fd, *addr));
        let shared = Arc::clone(&self.shared);
        let mut state = shared.state.lock();
        match state.sockets.get(&fd) {
            Some(SimSocket::Fresh { family }) if family_matches(*family, addr) => {}
            Some(SimSocket::Fresh { .. }) => return Err(Errno(EAFNOSUPPORT)),
            Some(SimSocket::Connected { .. }) => return Err(Errno(EISCONN)),
            Some(_) => return Err(Errno(EINVAL)),
            None => return Err(Errno(EBADF)),
        }

        if state.echo_addrs.contains(addr) {
            let server = state.allocate(SimSocket::Connected {
                peer: fd,
                inbound: VecDeque::new(),
                peer_closed: false,
                echo: true,
            });
            state.sockets.insert(fd, connected(server));
            return Ok(());
        }

        let listener = state.listener_for(addr).ok_or(Errno(ECONNREFUSED))?;
        if !matches!(
            state.sockets.get(&listener),
            Some(SimSocket::Listening { .. })
        ) {
            return Err(Errno(ECONNREFUSED));
        }
        let server = state.allocate(connected(fd));
        state.sockets.insert(fd, connected(server));
        if let Some(SimSocket::Listening { pending, .. }) = state.sockets.get_mut(&listener) {
            pending.push_back(server);
        }
        shared.wake.notify_all();
        Ok(())
    }

    fn bind(&mut self, fd: Fd, addr: &SocketAddr) -> Result<(), Errno> {
        self.calls.push(SimCall::Bind(fd, *addr));
        let mut state = self.lock();
        match state.sockets.get(&fd) {
            Some(SimSocket::Fresh { family }) if family_matches(*family, addr) => {}
            Some(SimSocket::Fresh { .. }) => return Err(Errno(EAFNOSUPPORT)),
            Some(_) => return Err(Errno(EINVAL)),
            None => return Err(Errno(EBADF)),
        }
        if is_broadcast(addr) {
            return Err(Errno(EADDRNOTAVAIL));
        }
        if state.bound.contains_key(addr) {
            return Err(Errno(EADDRINUSE));
        }
        state.bound.insert(*addr, fd);
        state.sockets.insert(fd, SimSocket::Bound { addr: *addr });
        Ok(())
    }

    fn listen(&mut self, fd: Fd, backlog: i32) -> Result<(), Errno> {
        self.calls.push(SimCall::Listen(fd, backlog));
        if let Some(err) = self.faults.listen_error {
            return Err(err);
        }
        let mut state = self.lock();
        let addr = match state.sockets.get(&fd) {
            Some(SimSocket::Bound { addr }) => *addr,
            Some(SimSocket::Listening { .. }) => return Ok(()),
            Some(_) => return Err(Errno(EINVAL)),
            None => return Err(Errno(EBADF)),
        };
        state.sockets.insert(
            fd,
            SimSocket::Listening {
                addr,
                pending: VecDeque::new(),
            },
        );
        Ok(())
    }

    fn accept(&mut self, fd: Fd) -> Result<Fd, Errno> {
        self.calls.push(SimCall::Accept(fd));
        let shared = Arc::clone(&self.shared);
        let deadline = Instant::now() + shared.block_timeout;
        let mut state = shared.state.lock();
        loop {
            match state.sockets.get_mut(&fd) {
                Some(SimSocket::Listening { pending, .. }) => {
                    if let Some(accepted) = pending.pop_front() {
                        return Ok(accepted);
                    }
                }
                Some(_) => return Err(Errno(EINVAL)),
                None => return Err(Errno(EBADF)),
            }
            if shared.wake.wait_until(&mut state, deadline).timed_out() {
                return Err(Errno(ETIMEDOUT));
            }
        }
    }

    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize, Errno> {
        self.calls.push(SimCall::Read(fd, buf.len()));
        if self.faults.failing_reads > 0 {
            self.faults.failing_reads -= 1;
            return Err(Errno(EIO));
        }
        let want = self.chunk(buf.len());
        if want == 0 {
            return Ok(0);
        }
        let shared = Arc::clone(&self.shared);
        let deadline = Instant::now() + shared.block_timeout;
        let mut state = shared.state.lock();
        loop {
            match state.sockets.get_mut(&fd) {
                Some(SimSocket::Connected {
                    inbound,
                    peer_closed,
                    ..
                }) => {
                    if !inbound.is_empty() {
                        let n = want.min(inbound.len());
                        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
                            *slot = byte;
                        }
                        shared.wake.notify_all();
                        return Ok(n);
                    }
                    if *peer_closed {
                        return Ok(0);
                    }
                }
                Some(_) => return Err(Errno(ENOTCONN)),
                None => return Err(Errno(EBADF)),
            }
            if shared.wake.wait_until(&mut state, deadline).timed_out() {
                return Err(Errno(ETIMEDOUT));
            }
        }
    }

    fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize, Errno> {
        self.calls.push(SimCall::Write(fd, buf.len()));
        if self.faults.failing_writes > 0 {
            self.faults.failing_writes -= 1;
            return Err(Errno(EIO));
        }
        let n = self.chunk(buf.len());
        let shared = Arc::clone(&self.shared);
        let mut state = shared.state.lock();
        let peer = match state.sockets.get(&fd) {
            Some(SimSocket::Connected {
                peer_closed: true, ..
            }) => return Err(Errno(EPIPE)),
            Some(SimSocket::Connected { peer, .. }) => *peer,
            Some(_) => return Err(Errno(ENOTCONN)),
            None => return Err(Errno(EBADF)),
        };
        let target = match state.sockets.get(&peer) {
            Some(SimSocket::Connected { echo: true, .. }) => fd,
            Some(SimSocket::Connected { .. }) => peer,
            _ => return Err(Errno(EPIPE)),
        };
        if let Some(SimSocket::Connected { inbound, .. }) = state.sockets.get_mut(&target) {
            inbound.extend(&buf[..n]);
        }
        shared.wake.notify_all();
        Ok(n)
    }

    fn close(&mut self, fd: Fd) -> Result<(), Errno> {
        self.calls.push(SimCall::Close(fd));
        let shared = Arc::clone(&self.shared);
        let mut state = shared.state.lock();
        let Some(socket) = state.sockets.remove(&fd) else {
            state.bad_closes += 1;
            return Err(Errno(EBADF));
        };
        match socket {
            SimSocket::Fresh { .. } => {}
            SimSocket::Bound { addr } => {
                state.bound.remove(&addr);
            }
            SimSocket::Listening { addr, pending } => {
                state.bound.remove(&addr);
                for orphan in pending {
                    if let Some(SimSocket::Connected { peer, .. }) = state.sockets.remove(&orphan) {
                        state.mark_peer_closed(peer);
                    }
                }
            }
            SimSocket::Connected { peer, .. } => {
                let echo_peer = matches!(
                    state.sockets.get(&peer),
                    Some(SimSocket::Connected { echo: true, .. })
                );
                if echo_peer {
                    state.sockets.remove(&peer);
                } else {
                    state.mark_peer_closed(peer);
                }
            }
        }
        shared.wake.notify_all();
        Ok(())
    }
}

fn connected(peer: Fd) -> SimSocket {
    SimSocket::Connected {
        peer,
        inbound: VecDeque::new(),
        peer_closed: false,
        echo: false,
    }
}
