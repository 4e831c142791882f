//! NAT mapping-behavior discovery (RFC 5780 §4.3), used to pick a
//! better server-reflexive gathering strategy before committing to a
//! STUN server. Grounded on
//! `original_source/src/source/Ice/NatBehaviorDiscovery.c`'s
//! `discoverNatMappingBehavior`: three STUN binding requests are sent
//! (to the server's primary address, to its alternate address at the
//! primary port, then to its alternate address at its alternate port)
//! and the mapped addresses they return are compared pairwise. Sending
//! the probes and waiting for responses is the embedder's job (this
//! crate holds no sockets); this module only classifies the result.

use shared::addr::SocketAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingBehavior {
    /// Not behind a NAT at all: the mapped address equals the local one.
    NoNat,
    /// Same external mapping regardless of the destination address.
    Independent,
    /// Mapping changes with the destination IP but not its port.
    AddressDependent,
    /// Mapping changes with the destination IP and port.
    AddressAndPortDependent,
}

/// Classifies mapping behavior from the three probe results RFC 5780
/// §4.3 describes. `local` is this host's socket address; `primary` is
/// the mapped address seen from the server's default address;
/// `alternate_ip` is the mapped address seen from the server's other IP
/// at its primary port; `alternate_ip_and_port` is the mapped address
/// seen from the server's other IP and other port.
pub fn classify_mapping_behavior(local: SocketAddress, primary: SocketAddress, alternate_ip: SocketAddress, alternate_ip_and_port: SocketAddress) -> MappingBehavior {
    if primary == local {
        return MappingBehavior::NoNat;
    }
    if primary == alternate_ip {
        return MappingBehavior::Independent;
    }
    if alternate_ip == alternate_ip_and_port {
        MappingBehavior::AddressDependent
    } else {
        MappingBehavior::AddressAndPortDependent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddress {
        SocketAddress::new([10, 0, 0, 1].into(), port)
    }

    #[test]
    fn no_nat_when_mapped_address_matches_local() {
        let local = addr(5000);
        assert_eq!(classify_mapping_behavior(local, local, local, local), MappingBehavior::NoNat);
    }

    #[test]
    fn independent_when_mapping_survives_a_changed_destination() {
        let local = addr(5000);
        let mapped = SocketAddress::new([203, 0, 113, 9].into(), 40000);
        assert_eq!(classify_mapping_behavior(local, mapped, mapped, mapped), MappingBehavior::Independent);
    }

    #[test]
    fn address_dependent_when_only_destination_port_leaves_mapping_unchanged() {
        let local = addr(5000);
        let primary = SocketAddress::new([203, 0, 113, 9].into(), 40000);
        let alternate_ip = SocketAddress::new([203, 0, 113, 9].into(), 40001);
        assert_eq!(
            classify_mapping_behavior(local, primary, alternate_ip, alternate_ip),
            MappingBehavior::AddressDependent
        );
    }

    #[test]
    fn address_and_port_dependent_when_every_probe_remaps() {
        let local = addr(5000);
        let primary = SocketAddress::new([203, 0, 113, 9].into(), 40000);
        let alternate_ip = SocketAddress::new([203, 0, 113, 9].into(), 40001);
        let alternate_ip_and_port = SocketAddress::new([203, 0, 113, 9].into(), 40002);
        assert_eq!(
            classify_mapping_behavior(local, primary, alternate_ip, alternate_ip_and_port),
            MappingBehavior::AddressAndPortDependent
        );
    }
}
