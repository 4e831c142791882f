//! Non-blocking UDP socket primitives (spec.md §4 "L4 Network primitives").

use crate::error::{Error, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket as StdUdpSocket};

/// Builder for a non-blocking UDP socket, mirroring the option set the
/// upstream mDNS socket builder exposes (`SO_REUSEADDR`/`SO_REUSEPORT`)
/// but without the multicast-join step, since host/server-reflexive and
/// TURN-relayed traffic is unicast.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpSocketBuilder {
    reuse_address: bool,
    reuse_port: bool,
}

impl UdpSocketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reuse_address(mut self, reuse: bool) -> Self {
        self.reuse_address = reuse;
        self
    }

    pub fn with_reuse_port(mut self, reuse: bool) -> Self {
        self.reuse_port = reuse;
        self
    }

    pub fn bind(self, addr: SocketAddr) -> Result<UdpSocket> {
        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

        if self.reuse_address {
            socket.set_reuse_address(true)?;
        }
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        if self.reuse_port {
            socket.set_reuse_port(true)?;
        }

        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let std_socket: StdUdpSocket = socket.into();
        Ok(UdpSocket { inner: std_socket })
    }
}

/// A bound, non-blocking UDP socket. Reads return `Ok(None)` on
/// `WouldBlock` instead of propagating it, since the sans-I/O cores
/// treat "nothing to read right now" as a normal poll outcome rather
/// than an error.
#[derive(Debug)]
pub struct UdpSocket {
    inner: StdUdpSocket,
}

impl UdpSocket {
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        UdpSocketBuilder::new().with_reuse_address(true).bind(addr)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize> {
        Ok(self.inner.send_to(buf, target)?)
    }

    /// Attempts a single non-blocking read. `WouldBlock` collapses to
    /// `Ok(None)`; every other I/O error propagates.
    pub fn try_recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        match self.inner.recv_from(buf) {
            Ok((n, src)) => Ok(Some((n, src))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolves a host/port pair to a concrete list of socket addresses
/// (spec.md §4 "address resolution"). DNS lookups are blocking by
/// nature of `ToSocketAddrs`; callers on a sans-I/O hot path should run
/// this off the poll loop (e.g. once, at signaling time).
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(Error::Io)?
        .collect();
    if addrs.is_empty() {
        return Err(Error::NoAddressResolved(format!("{host}:{port}")));
    }
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn bind_ephemeral_and_round_trip() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let a = UdpSocket::bind(addr).unwrap();
        let b = UdpSocket::bind(addr).unwrap();

        let b_addr = b.local_addr().unwrap();
        a.send_to(b"hello", b_addr).unwrap();

        let mut buf = [0u8; 16];
        let mut got = None;
        for _ in 0..100 {
            if let Some((n, src)) = b.try_recv_from(&mut buf).unwrap() {
                got = Some((n, src));
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let (n, _src) = got.expect("expected a datagram");
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn resolve_localhost() {
        let addrs = resolve("localhost", 443).unwrap();
        assert!(!addrs.is_empty());
    }
}
