//! Socket connection set: per-socket buffer and readiness multiplexer
//! (spec.md §4 "M1 Socket connection + listener").
//!
//! spec.md describes M1 as a dedicated thread that selects across
//! registered sockets with a 1 s timeout and a list-changed condition
//! variable. Under the sans-I/O redesign (see top-level design notes)
//! there is no dedicated thread: the caller owns the event loop and
//! calls [`SocketConnectionSet::poll_once`] whenever it wants to drain
//! readiness, so "list changed" is just inserting or removing an entry
//! with no synchronization needed.

use crate::error::{Error, Result};
use crate::socket::UdpSocket;
use bytes::BytesMut;
use shared::{TaggedBytesMut, TransportContext, TransportProtocol};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

const RECV_BUF_LEN: usize = 1500;

/// A set of bound UDP sockets, each keyed by its local address. Mirrors
/// spec.md's "per-socket buffer" by giving each socket its own scratch
/// receive buffer.
pub struct SocketConnectionSet {
    sockets: HashMap<SocketAddr, UdpSocket>,
    recv_buf: Vec<u8>,
}

impl Default for SocketConnectionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketConnectionSet {
    pub fn new() -> Self {
        Self {
            sockets: HashMap::new(),
            recv_buf: vec![0u8; RECV_BUF_LEN],
        }
    }

    /// Registers a bound socket. Replaces any existing connection
    /// already registered at the same local address.
    pub fn add_connection(&mut self, socket: UdpSocket) -> Result<SocketAddr> {
        let local_addr = socket.local_addr()?;
        self.sockets.insert(local_addr, socket);
        Ok(local_addr)
    }

    pub fn remove_connection(&mut self, local_addr: SocketAddr) {
        self.sockets.remove(&local_addr);
    }

    pub fn contains(&self, local_addr: SocketAddr) -> bool {
        self.sockets.contains_key(&local_addr)
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Drains one pending datagram from each registered socket, in
    /// registration-map order. Call repeatedly (or loop until it
    /// returns an empty vec) to fully drain readiness, since a single
    /// pass only takes one datagram per socket.
    pub fn poll_once(&mut self, now: Instant) -> Vec<TaggedBytesMut> {
        let mut out = Vec::new();
        for (local_addr, socket) in self.sockets.iter() {
            match socket.try_recv_from(&mut self.recv_buf) {
                Ok(Some((n, peer_addr))) => {
                    out.push(TaggedBytesMut {
                        now,
                        transport: TransportContext {
                            local_addr: *local_addr,
                            peer_addr,
                            transport_protocol: TransportProtocol::Udp,
                            ecn: None,
                        },
                        message: BytesMut::from(&self.recv_buf[..n]),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    log::debug!("socket {local_addr} read failed: {e}");
                }
            }
        }
        out
    }

    pub fn send(&self, transmit: &TaggedBytesMut) -> Result<usize> {
        let socket = self
            .sockets
            .get(&transmit.transport.local_addr)
            .ok_or(Error::UnknownConnection(transmit.transport.local_addr))?;
        socket.send_to(&transmit.message, transmit.transport.peer_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::UdpSocket;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[test]
    fn registers_and_removes_connections() {
        let mut set = SocketConnectionSet::new();
        let socket = UdpSocket::bind(loopback()).unwrap();
        let addr = set.add_connection(socket).unwrap();
        assert!(set.contains(addr));
        assert_eq!(set.len(), 1);
        set.remove_connection(addr);
        assert!(!set.contains(addr));
        assert!(set.is_empty());
    }

    #[test]
    fn poll_once_delivers_datagram() {
        let mut set = SocketConnectionSet::new();
        let a = UdpSocket::bind(loopback()).unwrap();
        let a_addr = set.add_connection(a).unwrap();

        let sender = UdpSocket::bind(loopback()).unwrap();
        sender.send_to(b"ping", a_addr).unwrap();

        let mut received = Vec::new();
        for _ in 0..100 {
            received = set.poll_once(Instant::now());
            if !received.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(received.len(), 1);
        assert_eq!(&received[0].message[..], b"ping");
        assert_eq!(received[0].transport.local_addr, a_addr);
    }

    #[test]
    fn send_to_unknown_connection_errors() {
        let set = SocketConnectionSet::new();
        let transmit = TaggedBytesMut {
            now: Instant::now(),
            transport: TransportContext {
                local_addr: loopback(),
                peer_addr: loopback(),
                transport_protocol: TransportProtocol::Udp,
                ecn: None,
            },
            message: BytesMut::from(&b"x"[..]),
        };
        assert!(set.send(&transmit).is_err());
    }
}
