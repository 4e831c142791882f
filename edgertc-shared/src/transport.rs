use bytes::BytesMut;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Instant;

/// Explicit congestion notification codepoint carried alongside a
/// transmit, mirrored from the upstream sans-I/O transport type so ECN
/// marking survives a trip through any `sansio::Protocol` impl in this
/// workspace.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EcnCodepoint {
    Ect0 = 0b10,
    Ect1 = 0b01,
    Ce = 0b11,
}

impl EcnCodepoint {
    pub fn from_bits(x: u8) -> Option<Self> {
        use EcnCodepoint::*;
        Some(match x & 0b11 {
            0b10 => Ect0,
            0b01 => Ect1,
            0b11 => Ce,
            _ => return None,
        })
    }
}

/// Type of transport protocol a [`TransportMessage`] travels over.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportProtocol {
    #[default]
    Udp,
    Tcp,
}

/// Local/peer address pair plus protocol for one [`TransportMessage`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportContext {
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
    pub transport_protocol: TransportProtocol,
    pub ecn: Option<EcnCodepoint>,
}

impl Default for TransportContext {
    fn default() -> Self {
        Self {
            local_addr: SocketAddr::from_str("0.0.0.0:0").unwrap(),
            peer_addr: SocketAddr::from_str("0.0.0.0:0").unwrap(),
            transport_protocol: TransportProtocol::Udp,
            ecn: None,
        }
    }
}

/// One unit of sans-I/O input/output: a message tagged with when it was
/// produced/received and where it came from or is going.
#[derive(Debug, Clone)]
pub struct TransportMessage<T> {
    pub now: Instant,
    pub transport: TransportContext,
    pub message: T,
}

pub type TaggedBytesMut = TransportMessage<BytesMut>;

/// Local/peer address pair, used to key demuxed sockets or ICE components
/// without carrying the protocol along.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FourTuple {
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
}

impl From<&TransportContext> for FourTuple {
    fn from(value: &TransportContext) -> Self {
        Self {
            local_addr: value.local_addr,
            peer_addr: value.peer_addr,
        }
    }
}

/// Local/peer address pair plus protocol, used to key demuxed sockets
/// that speak both UDP and TCP on the same port.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FiveTuple {
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
    pub transport_protocol: TransportProtocol,
}

impl From<&TransportContext> for FiveTuple {
    fn from(value: &TransportContext) -> Self {
        Self {
            local_addr: value.local_addr,
            peer_addr: value.peer_addr,
            transport_protocol: value.transport_protocol,
        }
    }
}
