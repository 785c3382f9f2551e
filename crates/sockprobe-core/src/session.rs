//! Socket ownership for one run.
//!
//! A [`TransferSession`] holds the handles a run acquired and nothing
//! else. A handle is recorded only after the call that produced it
//! succeeded, so cleanup never touches a descriptor that was never
//! opened. Handles still held when the session is dropped are closed.

use std::net::SocketAddr;

use crate::errno::Errno;
use crate::error::TransferError;
use crate::socket::{Fd, SocketApi};
use crate::spec::AddressFamily;

/// Sockets owned by one run.
pub struct TransferSession<A: SocketApi> {
    api: A,
    /// Connected socket (initiator) or accepted socket (responder).
    peer: Option<Fd>,
    /// Listening socket; responder only, kept for cleanup.
    listener: Option<Fd>,
}

impl<A: SocketApi> TransferSession<A> {
    fn empty(api: A) -> Self {
        Self {
            api,
            peer: None,
            listener: None,
        }
    }

    /// Create a socket and connect it to `addr`.
    pub fn open_initiator(api: A, addr: &SocketAddr) -> Result<Self, TransferError> {
        let mut session = Self::empty(api);
        let fd = session
            .api
            .socket(family_of(addr))
            .map_err(|code| TransferError::SocketCreateFailed { code })?;
        session.peer = Some(fd);
        session
            .api
            .connect(fd, addr)
            .map_err(|code| TransferError::ConnectFailed { code })?;
        Ok(session)
    }

    /// Create a socket, bind it to `addr`, listen, and accept exactly one
    /// peer. Blocks in accept.
    pub fn open_responder(api: A, addr: &SocketAddr, backlog: i32) -> Result<Self, TransferError> {
        let mut session = Self::new_responder(api);
        let listener = session.listen(addr, backlog)?;
        session.accept_peer(listener)?;
        Ok(session)
    }

    /// First half of [`open_responder`](Self::open_responder): acquire the
    /// listening socket without accepting.
    pub(crate) fn listen(&mut self, addr: &SocketAddr, backlog: i32) -> Result<Fd, TransferError> {
        let fd = self
            .api
            .socket(family_of(addr))
            .map_err(|code| TransferError::SocketCreateFailed { code })?;
        self.listener = Some(fd);
        self.api
            .bind(fd, addr)
            .map_err(|code| TransferError::BindFailed { code })?;
        self.api
            .listen(fd, backlog)
            .map_err(|code| TransferError::ListenFailed { code })?;
        Ok(fd)
    }

    /// Accept one peer on the listening socket acquired by `listen`.
    pub(crate) fn accept_peer(&mut self, listener: Fd) -> Result<(), TransferError> {
        let accepted = self
            .api
            .accept(listener)
            .map_err(|code| TransferError::AcceptFailed { code })?;
        self.peer = Some(accepted);
        Ok(())
    }

    /// Start a responder session that has not acquired anything yet.
    pub(crate) fn new_responder(api: A) -> Self {
        Self::empty(api)
    }

    /// One read on the peer socket.
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        let fd = self.peer.ok_or(Errno(crate::errno::ENOTCONN))?;
        self.api.read(fd, buf)
    }

    /// One write on the peer socket.
    pub fn write_some(&mut self, bytes: &[u8]) -> Result<usize, Errno> {
        let fd = self.peer.ok_or(Errno(crate::errno::ENOTCONN))?;
        self.api.write(fd, bytes)
    }

    /// Close every held handle, peer first. Returns the first close error.
    /// Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), Errno> {
        let mut first_err = None;
        for fd in [self.peer.take(), self.listener.take()].into_iter().flatten() {
            if let Err(err) = self.api.close(fd) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<A: SocketApi> Drop for TransferSession<A> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn family_of(addr: &SocketAddr) -> AddressFamily {
    match addr {
        SocketAddr::V4(_) => AddressFamily::V4,
        SocketAddr::V6(_) => AddressFamily::V6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno::{EADDRINUSE, EAFNOSUPPORT, ECONNREFUSED, EINVAL, ENOTCONN};
    use crate::sim::{SimCall, SimFaults, SimNetwork};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn refused_connect_closes_only_the_created_socket() {
        let net = SimNetwork::new();
        let mut api = net.endpoint();
        let err = TransferSession::open_initiator(&mut api, &addr(9)).err().unwrap();
        assert_eq!(
            err,
            TransferError::ConnectFailed {
                code: Errno(ECONNREFUSED)
            }
        );
        let closes: Vec<_> = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SimCall::Close(_)))
            .collect();
        assert_eq!(closes, vec![SimCall::Close(Fd(3))]);
    }

    #[test]
    fn failed_socket_creation_closes_nothing() {
        let net = SimNetwork::new();
        let mut api = net.endpoint_with(SimFaults {
            socket_error: Some(Errno(EAFNOSUPPORT)),
            ..SimFaults::default()
        });
        let err = TransferSession::open_initiator(&mut api, &addr(9)).err().unwrap();
        assert!(matches!(err, TransferError::SocketCreateFailed { .. }));
        assert!(!api.calls().iter().any(|c| matches!(c, SimCall::Close(_))));
    }

    #[test]
    fn bind_failure_releases_the_listening_socket_only() {
        let net = SimNetwork::new();
        let mut holder = net.endpoint();
        let mut held = TransferSession::new_responder(&mut holder);
        held.listen(&addr(7000), 1).unwrap();

        let mut api = net.endpoint();
        let err = TransferSession::open_responder(&mut api, &addr(7000), 1)
            .err()
            .unwrap();
        assert_eq!(
            err,
            TransferError::BindFailed {
                code: Errno(EADDRINUSE)
            }
        );
        let calls = api.calls();
        assert!(!calls.iter().any(|c| matches!(c, SimCall::Accept(_))));
        assert_eq!(
            calls
                .iter()
                .filter(|c| matches!(c, SimCall::Close(_)))
                .count(),
            1
        );
    }

    #[test]
    fn listen_failure_closes_the_bound_socket_once() {
        let net = SimNetwork::new();
        let mut api = net.endpoint_with(SimFaults {
            listen_error: Some(Errno(EINVAL)),
            ..SimFaults::default()
        });
        let err = TransferSession::open_responder(&mut api, &addr(7001), 1)
            .err()
            .unwrap();
        assert_eq!(
            err,
            TransferError::ListenFailed {
                code: Errno(EINVAL)
            }
        );
        let closes: Vec<_> = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SimCall::Close(_)))
            .collect();
        assert_eq!(closes, vec![SimCall::Close(Fd(3))]);
        assert_eq!(net.bad_close_count(), 0);
        assert_eq!(net.open_sockets(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let net = SimNetwork::new();
        let mut server_api = net.endpoint();
        let mut server = TransferSession::new_responder(&mut server_api);
        let listener = server.listen(&addr(7001), 1).unwrap();

        let mut client_api = net.endpoint();
        let mut client = TransferSession::open_initiator(&mut client_api, &addr(7001)).unwrap();
        server.accept_peer(listener).unwrap();

        assert_eq!(client.close(), Ok(()));
        assert_eq!(client.close(), Ok(()));
        assert_eq!(server.close(), Ok(()));
        assert_eq!(server.close(), Ok(()));
        drop(client);
        drop(server);

        let closes = client_api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SimCall::Close(_)))
            .count();
        assert_eq!(closes, 1);
        let server_closes = server_api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SimCall::Close(_)))
            .count();
        assert_eq!(server_closes, 2);
    }

    #[test]
    fn io_without_a_peer_reports_not_connected() {
        let net = SimNetwork::new();
        let mut api = net.endpoint();
        let mut session = TransferSession::new_responder(&mut api);
        assert_eq!(session.write_some(b"x"), Err(Errno(ENOTCONN)));
        let mut buf = [0u8; 4];
        assert_eq!(session.read_some(&mut buf), Err(Errno(ENOTCONN)));
    }

    #[test]
    fn drop_releases_held_handles() {
        let net = SimNetwork::new();
        let mut api = net.endpoint();
        {
            let mut session = TransferSession::new_responder(&mut api);
            session.listen(&addr(7002), 1).unwrap();
        }
        // The port is free again once the listener was closed on drop.
        let mut again = TransferSession::new_responder(&mut api);
        assert!(again.listen(&addr(7002), 1).is_ok());
        assert_eq!(net.bad_close_count(), 0);
    }
}
