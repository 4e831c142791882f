//! XOR-MAPPED-ADDRESS transform (spec.md §4.1): port is XORed with the
//! high 16 bits of the magic cookie; the first four address bytes are
//! XORed with the magic cookie; for IPv6 the remaining 12 bytes are
//! XORed with the transaction id.

use crate::message::MAGIC_COOKIE;
use shared::addr::SocketAddress;
use std::net::IpAddr;

/// Applies the XOR transform. Because XOR is its own inverse this same
/// function both encodes and decodes (property 3: `xor(xor(a,t),t)==a`).
pub fn xor_address(addr: &SocketAddress, transaction_id: &[u8; 12]) -> SocketAddress {
    let cookie = MAGIC_COOKIE.to_be_bytes();
    let xport = addr.port() ^ ((u32::from_be_bytes(cookie) >> 16) as u16);

    let octets = addr.octets();
    let mut xored = vec![0u8; octets.len()];
    for i in 0..4.min(octets.len()) {
        xored[i] = octets[i] ^ cookie[i];
    }
    if octets.len() == 16 {
        for i in 4..16 {
            xored[i] = octets[i] ^ transaction_id[i - 4];
        }
    }

    let ip = match addr.ip() {
        IpAddr::V4(_) => SocketAddress::from_octets(&xored, xport).unwrap(),
        IpAddr::V6(_) => SocketAddress::from_octets(&xored, xport).unwrap(),
    };
    ip
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    #[test]
    fn involution_ipv4() {
        let tid = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let a = SocketAddress::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)), 49152);
        let once = xor_address(&a, &tid);
        let twice = xor_address(&once, &tid);
        assert_eq!(a, twice);
    }

    #[test]
    fn involution_ipv6() {
        let tid = [9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 11, 12];
        let a = SocketAddress::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 443);
        let once = xor_address(&a, &tid);
        let twice = xor_address(&once, &tid);
        assert_eq!(a, twice);
    }

    /// Known-answer test for RFC 5389 §15.2's XOR-MAPPED-ADDRESS formula:
    /// transaction id 000102030405060708090A0B and (203.0.113.5, 49152)
    /// produce the XOR-MAPPED-ADDRESS payload computed byte-for-byte below.
    #[test]
    fn known_answer() {
        let tid: [u8; 12] = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b,
        ];
        let a = SocketAddress::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)), 49152);
        let xored = xor_address(&a, &tid);

        let cookie = MAGIC_COOKIE.to_be_bytes();
        let expected_port = 49152u16 ^ u16::from_be_bytes([cookie[0], cookie[1]]);
        assert_eq!(xored.port(), expected_port);

        let expected_octets = [
            203u8 ^ cookie[0],
            0 ^ cookie[1],
            113 ^ cookie[2],
            5 ^ cookie[3],
        ];
        assert_eq!(xored.octets(), expected_octets.to_vec());

        let mut payload = vec![0u8, 0x01];
        payload.extend_from_slice(&xored.port().to_be_bytes());
        payload.extend_from_slice(&xored.octets());
        assert_eq!(payload, vec![0x00, 0x01, 0xe1, 0x12, 0xea, 0x12, 0xd5, 0x47]);
    }
}
