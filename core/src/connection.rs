//! A single TCP socket with a timed connect.
//!
//! # Design
//! `Connection` moves through `Created → Connected → Closed` and never touches
//! its socket again once closed; `close` is idempotent and also runs on drop,
//! so every early return in the caller still releases the descriptor.
//!
//! The timed connect follows the classic non-blocking pattern: the socket is
//! switched to non-blocking mode, the connect is issued, and the caller waits
//! for readiness bounded by the timeout. Blocking mode is restored before
//! `connect` returns. A timeout is reported as `Ok(false)`, not as an error.

use std::io::{self, Read};
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::error::ClientError;
use crate::net::NetContext;
use crate::resolver::AddressCandidate;

/// Size of the buffer handed to each `receive` call.
pub const RECEIVE_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Created,
    Connected,
    Closed,
}

/// Source of response bytes for `ResponseReader`.
///
/// `Connection` is the production implementation; tests replay canned byte
/// streams through their own implementations.
pub trait Transport {
    /// Return the next chunk of bytes, or an empty vector when nothing arrived.
    fn receive(&mut self) -> Result<Vec<u8>, ClientError>;
}

#[derive(Debug)]
pub struct Connection {
    socket: Option<Socket>,
    state: ConnectionState,
    peer: Option<SocketAddr>,
    net: &'static NetContext,
}

impl Connection {
    /// Allocate a socket. `protocol` of `None` lets the OS pick the default
    /// protocol for `ty`.
    pub fn create(family: Domain, ty: Type, protocol: Option<Protocol>) -> Result<Self, ClientError> {
        let net = NetContext::acquire();
        let socket = Socket::new(family, ty, protocol).map_err(|e| ClientError::socket("create", &e))?;
        net.socket_opened();
        Ok(Self {
            socket: Some(socket),
            state: ConnectionState::Created,
            peer: None,
            net,
        })
    }

    /// Create a socket matching `candidate`'s family, type and protocol.
    pub fn for_candidate(candidate: &AddressCandidate) -> Result<Self, ClientError> {
        Self::create(candidate.family, candidate.socket_type, Some(candidate.protocol))
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Connect to `candidate`.
    ///
    /// A zero `timeout` performs a plain blocking connect. Otherwise the
    /// connect is bounded by `timeout` and `Ok(false)` means it did not
    /// complete in time. Refusal and other socket conditions are errors.
    pub fn connect(&mut self, candidate: &AddressCandidate, timeout: Duration) -> Result<bool, ClientError> {
        let addr = candidate.addr;
        let target = SockAddr::from(addr);
        let socket = self.open_socket("connect")?;

        if timeout.is_zero() {
            socket.connect(&target).map_err(|e| ClientError::connection(addr, &e))?;
        } else {
            match socket.connect_timeout(&target, timeout) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    tracing::warn!("connect to {addr} ({}) timed out after {timeout:?}", candidate.canonical_name);
                    return Ok(false);
                }
                Err(e) => return Err(ClientError::connection(addr, &e)),
            }
        }

        tracing::debug!("connected to {addr}");
        self.state = ConnectionState::Connected;
        self.peer = Some(addr);
        Ok(true)
    }

    /// Toggle non-blocking mode on the underlying socket.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), ClientError> {
        self.open_socket("set_nonblocking")?
            .set_nonblocking(nonblocking)
            .map_err(|e| ClientError::socket("set_nonblocking", &e))
    }

    /// Issue a single send. Short writes are not retried; the number of bytes
    /// the OS accepted is returned.
    pub fn send(&mut self, bytes: &[u8]) -> Result<usize, ClientError> {
        let peer = self.peer;
        let sent = self
            .open_socket("send")?
            .send(bytes)
            .map_err(|e| failure(peer, "send", &e))?;
        tracing::debug!("sent {sent} of {} bytes", bytes.len());
        Ok(sent)
    }

    /// Issue a single receive of at most `RECEIVE_BUFFER_SIZE` bytes.
    ///
    /// Returns an empty vector when the peer has closed (or reset) the
    /// connection, or when a non-blocking socket has no data yet.
    pub fn receive(&mut self) -> Result<Vec<u8>, ClientError> {
        let peer = self.peer;
        if self.state == ConnectionState::Closed {
            return Err(closed_error("receive"));
        }
        let Some(socket) = self.socket.as_mut() else {
            return Err(closed_error("receive"));
        };

        let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
        match socket.read(&mut buf) {
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) if matches!(e.kind(), io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted) => {
                tracing::debug!("peer reset the connection: {e}");
                Ok(Vec::new())
            }
            Err(e) => Err(failure(peer, "receive", &e)),
        }
    }

    /// Release the socket. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            drop(socket);
            self.net.socket_closed();
            match self.peer {
                Some(addr) => tracing::debug!("closed connection to {addr}"),
                None => tracing::debug!("closed unconnected socket"),
            }
        }
        self.state = ConnectionState::Closed;
    }

    fn open_socket(&self, operation: &'static str) -> Result<&Socket, ClientError> {
        match (&self.socket, self.state) {
            (Some(socket), ConnectionState::Created | ConnectionState::Connected) => Ok(socket),
            _ => Err(closed_error(operation)),
        }
    }
}

impl Transport for Connection {
    fn receive(&mut self) -> Result<Vec<u8>, ClientError> {
        Connection::receive(self)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

fn failure(peer: Option<SocketAddr>, operation: &'static str, err: &io::Error) -> ClientError {
    match peer {
        Some(addr) => ClientError::connection(addr, err),
        None => ClientError::socket(operation, err),
    }
}

fn closed_error(operation: &'static str) -> ClientError {
    ClientError::Socket {
        operation,
        code: None,
        message: "connection is closed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    fn candidate_for(addr: SocketAddr) -> AddressCandidate {
        AddressCandidate::ipv4_tcp(addr, "localhost")
    }

    fn refused_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    #[test]
    fn create_starts_in_created_state() {
        let conn = Connection::create(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).unwrap();
        assert_eq!(conn.state(), ConnectionState::Created);
        assert!(conn.peer_addr().is_none());
    }

    #[test]
    fn timed_connect_send_and_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut conn = Connection::for_candidate(&candidate_for(addr)).unwrap();
        assert!(conn.connect(&candidate_for(addr), Duration::from_millis(1000)).unwrap());
        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(conn.peer_addr(), Some(addr));

        let (mut peer, _) = listener.accept().unwrap();
        assert_eq!(conn.send(b"ping").unwrap(), 4);

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        peer.write_all(b"pong").unwrap();
        assert_eq!(conn.receive().unwrap(), b"pong".to_vec());
    }

    #[test]
    fn blocking_connect_with_zero_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut conn = Connection::for_candidate(&candidate_for(addr)).unwrap();
        assert!(conn.connect(&candidate_for(addr), Duration::ZERO).unwrap());
    }

    #[test]
    fn refused_connect_is_an_error() {
        let addr = refused_addr();
        for timeout in [Duration::ZERO, Duration::from_millis(500)] {
            let mut conn = Connection::for_candidate(&candidate_for(addr)).unwrap();
            let err = conn.connect(&candidate_for(addr), timeout).unwrap_err();
            assert!(matches!(err, ClientError::Connection { addr: a, .. } if a == addr), "{err}");
        }
    }

    #[test]
    fn receive_after_peer_close_is_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut conn = Connection::for_candidate(&candidate_for(addr)).unwrap();
        conn.connect(&candidate_for(addr), Duration::from_millis(1000)).unwrap();
        let (peer, _) = listener.accept().unwrap();
        drop(peer);
        assert!(conn.receive().unwrap().is_empty());
    }

    #[test]
    fn nonblocking_receive_without_data_is_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut conn = Connection::for_candidate(&candidate_for(addr)).unwrap();
        conn.connect(&candidate_for(addr), Duration::from_millis(1000)).unwrap();
        let _peer = listener.accept().unwrap();

        conn.set_nonblocking(true).unwrap();
        assert!(conn.receive().unwrap().is_empty());
        conn.set_nonblocking(false).unwrap();
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_io() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut conn = Connection::for_candidate(&candidate_for(addr)).unwrap();
        conn.connect(&candidate_for(addr), Duration::from_millis(1000)).unwrap();

        conn.close();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(matches!(conn.send(b"x"), Err(ClientError::Socket { operation: "send", .. })));
        assert!(matches!(conn.receive(), Err(ClientError::Socket { operation: "receive", .. })));
        assert!(conn.connect(&candidate_for(addr), Duration::ZERO).is_err());
    }
}
