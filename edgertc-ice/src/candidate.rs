//! Candidate types and priority math (spec.md §3 "Candidate", §4.3).
//! Grounded on `rtc-ice/src/candidate/mod.rs` and `candidate_base.rs`,
//! stripped of the teacher's trait-object/async machinery since the
//! agent here owns candidates as plain values in a `Vec`.

use crc::{Crc, CRC_32_ISCSI};
use shared::addr::SocketAddress;
use std::fmt;

pub(crate) const DEFAULT_LOCAL_PREFERENCE: u16 = 65535;
pub(crate) const COMPONENT_RTP: u16 = 1;

/// RFC 5245 §4.1.2.2: recommended type preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateType {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relay,
}

impl CandidateType {
    pub const fn preference(self) -> u16 {
        match self {
            Self::Host => 126,
            Self::PeerReflexive => 110,
            Self::ServerReflexive => 100,
            Self::Relay => 0,
        }
    }
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Host => "host",
            Self::ServerReflexive => "srflx",
            Self::PeerReflexive => "prflx",
            Self::Relay => "relay",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub candidate_type: CandidateType,
    pub component: u16,
    pub address: SocketAddress,
    pub related_address: Option<SocketAddress>,
    pub network_id: String,
}

impl Candidate {
    pub fn host(address: SocketAddress, network_id: impl Into<String>) -> Self {
        Self {
            candidate_type: CandidateType::Host,
            component: COMPONENT_RTP,
            address,
            related_address: None,
            network_id: network_id.into(),
        }
    }

    pub fn server_reflexive(address: SocketAddress, related_address: SocketAddress) -> Self {
        Self {
            candidate_type: CandidateType::ServerReflexive,
            component: COMPONENT_RTP,
            address,
            related_address: Some(related_address),
            network_id: String::new(),
        }
    }

    pub fn relay(address: SocketAddress, related_address: SocketAddress) -> Self {
        Self {
            candidate_type: CandidateType::Relay,
            component: COMPONENT_RTP,
            address,
            related_address: Some(related_address),
            network_id: String::new(),
        }
    }

    pub fn peer_reflexive(address: SocketAddress) -> Self {
        Self {
            candidate_type: CandidateType::PeerReflexive,
            component: COMPONENT_RTP,
            address,
            related_address: None,
            network_id: String::new(),
        }
    }

    /// RFC 5245 §4.1.1.3: groups candidates sharing type, base address,
    /// transport, and STUN/TURN server.
    pub fn foundation(&self) -> String {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.candidate_type.to_string().as_bytes());
        buf.extend_from_slice(self.address.ip().to_string().as_bytes());
        buf.extend_from_slice(self.network_id.as_bytes());
        let checksum = Crc::<u32>::new(&CRC_32_ISCSI).checksum(&buf);
        checksum.to_string()
    }

    /// RFC 5245 §4.1.2.1: `priority = 2^24*type_pref + 2^8*local_pref + (256 - component)`.
    pub fn priority(&self) -> u32 {
        let type_pref = u32::from(self.candidate_type.preference());
        let local_pref = u32::from(DEFAULT_LOCAL_PREFERENCE);
        (type_pref << 24) | (local_pref << 8) | (256 - u32::from(self.component))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.candidate_type, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(a: u8, b: u8, c: u8, d: u8, port: u16) -> SocketAddress {
        SocketAddress::new(IpAddr::V4(Ipv4Addr::new(a, b, c, d)), port)
    }

    #[test]
    fn host_outranks_server_reflexive_outranks_relay() {
        let host = Candidate::host(addr(192, 168, 1, 5, 4000), "eth0");
        let srflx = Candidate::server_reflexive(addr(203, 0, 113, 5, 4000), addr(192, 168, 1, 5, 4000));
        let relay = Candidate::relay(addr(203, 0, 113, 9, 50000), addr(192, 168, 1, 5, 4000));
        assert!(host.priority() > srflx.priority());
        assert!(srflx.priority() > relay.priority());
    }

    #[test]
    fn foundation_depends_on_type_and_base_address_only() {
        let a = Candidate::host(addr(192, 168, 1, 5, 4000), "eth0");
        let b = Candidate::host(addr(192, 168, 1, 5, 4001), "eth0");
        assert_eq!(a.foundation(), b.foundation());
        let c = Candidate::host(addr(192, 168, 1, 6, 4000), "eth0");
        assert_ne!(a.foundation(), c.foundation());
    }
}
