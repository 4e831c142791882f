//! STUN header + attribute-table codec (spec.md §4.1).

use crate::attributes::*;
use crate::error::{Error, Result};
use crate::fingerprint;
use crate::integrity;
use crate::xoraddr::xor_address;
use shared::addr::SocketAddress;

pub const MAGIC_COOKIE: u32 = 0x2112_a442;
pub const HEADER_LEN: usize = 20;
const ATTR_HEADER_LEN: usize = 4;
const MAX_ATTRIBUTES: usize = 64;

const FAMILY_IPV4: u8 = 0x01;
const FAMILY_IPV6: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Request,
    Indication,
    SuccessResponse,
    ErrorResponse,
}

impl Class {
    fn bits(self) -> u16 {
        match self {
            Class::Request => 0b00,
            Class::Indication => 0b01,
            Class::SuccessResponse => 0b10,
            Class::ErrorResponse => 0b11,
        }
    }

    fn from_bits(bits: u16) -> Self {
        match bits {
            0b00 => Class::Request,
            0b01 => Class::Indication,
            0b10 => Class::SuccessResponse,
            _ => Class::ErrorResponse,
        }
    }
}

pub const METHOD_BINDING: u16 = 0x001;
pub const METHOD_ALLOCATE: u16 = 0x003;
pub const METHOD_REFRESH: u16 = 0x004;
pub const METHOD_SEND: u16 = 0x006;
pub const METHOD_DATA: u16 = 0x007;
pub const METHOD_CREATE_PERMISSION: u16 = 0x008;
pub const METHOD_CHANNEL_BIND: u16 = 0x009;

fn pack_type(method: u16, class: Class) -> u16 {
    let a = method & 0x000f;
    let b = (method & 0x0070) << 1;
    let c = (method & 0x0f80) << 2;
    let mut m = a | b | c;
    m |= (class.bits() & 0b01) << 4;
    m |= (class.bits() & 0b10) << 7;
    m
}

fn unpack_type(raw: u16) -> (u16, Class) {
    let a = raw & 0x000f;
    let b = (raw & 0x00e0) >> 1;
    let c = (raw & 0x3e00) >> 2;
    let method = a | b | c;
    let class_bits = ((raw >> 4) & 0b01) | ((raw >> 7) & 0b10);
    (method, Class::from_bits(class_bits))
}

/// A decoded STUN message: header fields plus the ordered, non-security
/// attributes (MESSAGE-INTEGRITY/FINGERPRINT are handled out of band by
/// [`Message::encode`]/[`Message::decode`], see module docs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub method: u16,
    pub class: Class,
    pub transaction_id: [u8; 12],
    pub attributes: Vec<Attribute>,
}

impl Message {
    pub fn new(method: u16, class: Class, transaction_id: [u8; 12]) -> Self {
        Self {
            method,
            class,
            transaction_id,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attr: Attribute) -> Self {
        self.attributes.push(attr);
        self
    }

    /// Serializes the message. `integrity_key`, when set, appends a
    /// MESSAGE-INTEGRITY attribute computed over every byte written so
    /// far (spec.md §4.1: "computed over all preceding bytes"). When
    /// `fingerprint` is set, a FINGERPRINT attribute follows, computed
    /// over everything including the integrity attribute just written.
    pub fn encode(&self, integrity_key: Option<&[u8]>, fingerprint: bool) -> Result<Vec<u8>> {
        if self.attributes.len() > MAX_ATTRIBUTES {
            return Err(Error::MaxAttributeCount);
        }

        let mut body = Vec::new();
        for attr in &self.attributes {
            encode_attribute(&mut body, attr, &self.transaction_id)?;
        }

        // Header length must reflect the final message length, including
        // the attributes we're about to append below, before it is used
        // as the integrity/fingerprint MAC input.
        let integrity_len = integrity_key.map(|_| ATTR_HEADER_LEN + integrity::SIZE).unwrap_or(0);
        let fingerprint_len = if fingerprint { ATTR_HEADER_LEN + 4 } else { 0 };
        let mut out = Vec::with_capacity(HEADER_LEN + body.len() + integrity_len + fingerprint_len);
        self.write_header(&mut out, (body.len() + integrity_len + fingerprint_len) as u16);
        out.extend_from_slice(&body);

        if let Some(key) = integrity_key {
            let mac = integrity::compute(key, &out);
            encode_tlv(&mut out, TYPE_MESSAGE_INTEGRITY, &mac);
        }

        if fingerprint {
            // The fingerprint XOR constant is applied to the CRC32 inside
            // `fingerprint::compute`; the length field already accounts
            // for this attribute (computed above) per spec.md's "size
            // only passes return the exact required length" rule.
            let crc = fingerprint::compute(&out);
            encode_tlv(&mut out, TYPE_FINGERPRINT, &crc.to_be_bytes());
        }

        Ok(out)
    }

    fn write_header(&self, out: &mut Vec<u8>, attrs_len: u16) {
        out.extend_from_slice(&pack_type(self.method, self.class).to_be_bytes());
        out.extend_from_slice(&attrs_len.to_be_bytes());
        out.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
        out.extend_from_slice(&self.transaction_id);
    }

    /// Deserializes and validates a message. `password`, when set,
    /// verifies MESSAGE-INTEGRITY if present; fingerprint is always
    /// verified when present regardless of `password`. Security
    /// attributes are consumed, not returned in `attributes`.
    pub fn decode(data: &[u8], password: Option<&[u8]>) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::TruncatedAttribute);
        }
        let raw_type = u16::from_be_bytes([data[0], data[1]]);
        let declared_len = u16::from_be_bytes([data[2], data[3]]) as usize;
        let cookie = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if cookie != MAGIC_COOKIE {
            return Err(Error::MagicCookieMismatch);
        }
        let mut transaction_id = [0u8; 12];
        transaction_id.copy_from_slice(&data[8..20]);

        if data.len() < HEADER_LEN + declared_len {
            return Err(Error::TruncatedAttribute);
        }
        let (method, class) = unpack_type(raw_type);
        let mut message = Message::new(method, class, transaction_id);

        let mut offset = HEADER_LEN;
        let end = HEADER_LEN + declared_len;
        let mut seen_integrity = false;
        let mut seen_fingerprint = false;
        let mut attrs_after_integrity = 0usize;

        while offset < end {
            if offset + ATTR_HEADER_LEN > end {
                return Err(Error::TruncatedAttribute);
            }
            let kind = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let len = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
            let value_start = offset + ATTR_HEADER_LEN;
            let value_end = value_start + len;
            if value_end > end {
                return Err(Error::TruncatedAttribute);
            }
            let value = &data[value_start..value_end];

            if seen_fingerprint {
                // Nothing may follow FINGERPRINT.
                return Err(Error::FingerprintNotLast);
            }

            if kind == TYPE_MESSAGE_INTEGRITY {
                if seen_integrity {
                    return Err(Error::MultipleIntegrityAttributes);
                }
                seen_integrity = true;
                if let Some(key) = password {
                    if value.len() != integrity::SIZE {
                        return Err(Error::InvalidAttributeLength(kind));
                    }
                    if !integrity::verify(key, &data[..offset], value) {
                        return Err(Error::IntegrityMismatch);
                    }
                }
            } else if kind == TYPE_FINGERPRINT {
                if seen_fingerprint {
                    return Err(Error::MultipleFingerprintAttributes);
                }
                if value.len() != 4 {
                    return Err(Error::InvalidAttributeLength(kind));
                }
                let expected = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
                if fingerprint::compute(&data[..offset]) != expected {
                    return Err(Error::FingerprintMismatch);
                }
                seen_fingerprint = true;
            } else {
                if seen_integrity {
                    attrs_after_integrity += 1;
                    if attrs_after_integrity > 1 {
                        // Only FINGERPRINT may come after MESSAGE-INTEGRITY.
                        return Err(Error::IntegrityNotLast);
                    }
                }
                message
                    .attributes
                    .push(decode_attribute(kind, value, &transaction_id)?);
            }

            // Attribute values are padded to a 4-byte boundary.
            let padded_len = (len + 3) & !3;
            offset = value_start + padded_len;
        }

        if seen_integrity && attrs_after_integrity > 0 && !seen_fingerprint {
            return Err(Error::IntegrityNotLast);
        }

        Ok(message)
    }
}

fn encode_tlv(out: &mut Vec<u8>, kind: u16, value: &[u8]) {
    out.extend_from_slice(&kind.to_be_bytes());
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    let pad = (4 - (value.len() % 4)) % 4;
    out.extend(std::iter::repeat(0u8).take(pad));
}

fn encode_address(out: &mut Vec<u8>, kind: u16, addr: &SocketAddress) {
    let mut value = Vec::with_capacity(4 + 16);
    value.push(0);
    value.push(if addr.is_ipv4() { FAMILY_IPV4 } else { FAMILY_IPV6 });
    value.extend_from_slice(&addr.port().to_be_bytes());
    value.extend_from_slice(&addr.octets());
    encode_tlv(out, kind, &value);
}

fn encode_xor_address(out: &mut Vec<u8>, kind: u16, addr: &SocketAddress, tid: &[u8; 12]) {
    encode_address(out, kind, &xor_address(addr, tid));
}

fn decode_address(value: &[u8], kind: u16) -> Result<SocketAddress> {
    if value.len() < 4 {
        return Err(Error::InvalidAttributeLength(kind));
    }
    let family = value[1];
    let port = u16::from_be_bytes([value[2], value[3]]);
    let octets = &value[4..];
    let expected_len = match family {
        FAMILY_IPV4 => 4,
        FAMILY_IPV6 => 16,
        _ => return Err(Error::InvalidAttributeLength(kind)),
    };
    if octets.len() != expected_len {
        return Err(Error::InvalidAttributeLength(kind));
    }
    SocketAddress::from_octets(octets, port).ok_or(Error::InvalidAttributeLength(kind))
}

fn decode_xor_address(value: &[u8], kind: u16, tid: &[u8; 12]) -> Result<SocketAddress> {
    let encoded = decode_address(value, kind)?;
    Ok(xor_address(&encoded, tid))
}

fn encode_attribute(out: &mut Vec<u8>, attr: &Attribute, tid: &[u8; 12]) -> Result<()> {
    match attr {
        Attribute::MappedAddress(a) => encode_address(out, TYPE_MAPPED_ADDRESS, a),
        Attribute::XorMappedAddress(a) => encode_xor_address(out, TYPE_XOR_MAPPED_ADDRESS, a, tid),
        Attribute::XorPeerAddress(a) => encode_xor_address(out, TYPE_XOR_PEER_ADDRESS, a, tid),
        Attribute::XorRelayedAddress(a) => encode_xor_address(out, TYPE_XOR_RELAYED_ADDRESS, a, tid),
        Attribute::Username(s) => encode_tlv(out, TYPE_USERNAME, s.as_bytes()),
        Attribute::Realm(s) => encode_tlv(out, TYPE_REALM, s.as_bytes()),
        Attribute::Nonce(s) => encode_tlv(out, TYPE_NONCE, s.as_bytes()),
        Attribute::Priority(p) => encode_tlv(out, TYPE_PRIORITY, &p.to_be_bytes()),
        Attribute::UseCandidate => encode_tlv(out, TYPE_USE_CANDIDATE, &[]),
        Attribute::Lifetime(l) => encode_tlv(out, TYPE_LIFETIME, &l.to_be_bytes()),
        Attribute::ChangeRequest { change_ip, change_port } => {
            let mut flags = 0u32;
            if *change_ip {
                flags |= 0x04;
            }
            if *change_port {
                flags |= 0x02;
            }
            encode_tlv(out, TYPE_CHANGE_REQUEST, &flags.to_be_bytes());
        }
        Attribute::RequestedTransport(proto) => {
            encode_tlv(out, TYPE_REQUESTED_TRANSPORT, &[*proto, 0, 0, 0])
        }
        Attribute::ErrorCode { code, reason } => {
            let mut value = vec![0u8, 0, (code / 100) as u8, (code % 100) as u8];
            value.extend_from_slice(reason.as_bytes());
            encode_tlv(out, TYPE_ERROR_CODE, &value);
        }
        Attribute::IceControlled(tb) => encode_tlv(out, TYPE_ICE_CONTROLLED, &tb.to_be_bytes()),
        Attribute::IceControlling(tb) => encode_tlv(out, TYPE_ICE_CONTROLLING, &tb.to_be_bytes()),
        Attribute::Data(d) => encode_tlv(out, TYPE_DATA, d),
        Attribute::ChannelNumber(n) => {
            let mut value = n.to_be_bytes().to_vec();
            value.extend_from_slice(&[0, 0]);
            encode_tlv(out, TYPE_CHANNEL_NUMBER, &value);
        }
        Attribute::Unknown { kind, value } => encode_tlv(out, *kind, value),
    }
    Ok(())
}

fn decode_attribute(kind: u16, value: &[u8], tid: &[u8; 12]) -> Result<Attribute> {
    Ok(match kind {
        TYPE_MAPPED_ADDRESS => Attribute::MappedAddress(decode_address(value, kind)?),
        TYPE_XOR_MAPPED_ADDRESS => Attribute::XorMappedAddress(decode_xor_address(value, kind, tid)?),
        TYPE_XOR_PEER_ADDRESS => Attribute::XorPeerAddress(decode_xor_address(value, kind, tid)?),
        TYPE_XOR_RELAYED_ADDRESS => {
            Attribute::XorRelayedAddress(decode_xor_address(value, kind, tid)?)
        }
        TYPE_USERNAME => Attribute::Username(decode_utf8(value, kind)?),
        TYPE_REALM => Attribute::Realm(decode_utf8(value, kind)?),
        TYPE_NONCE => Attribute::Nonce(decode_utf8(value, kind)?),
        TYPE_PRIORITY => Attribute::Priority(decode_u32(value, kind)?),
        TYPE_USE_CANDIDATE => {
            if !value.is_empty() {
                return Err(Error::InvalidAttributeLength(kind));
            }
            Attribute::UseCandidate
        }
        TYPE_LIFETIME => Attribute::Lifetime(decode_u32(value, kind)?),
        TYPE_CHANGE_REQUEST => {
            let flags = decode_u32(value, kind)?;
            Attribute::ChangeRequest {
                change_ip: flags & 0x04 != 0,
                change_port: flags & 0x02 != 0,
            }
        }
        TYPE_REQUESTED_TRANSPORT => {
            if value.len() != 4 {
                return Err(Error::InvalidAttributeLength(kind));
            }
            Attribute::RequestedTransport(value[0])
        }
        TYPE_ERROR_CODE => {
            if value.len() < 4 {
                return Err(Error::InvalidAttributeLength(kind));
            }
            let code = value[2] as u16 * 100 + value[3] as u16;
            let reason = decode_utf8(&value[4..], kind)?;
            Attribute::ErrorCode { code, reason }
        }
        TYPE_ICE_CONTROLLED => Attribute::IceControlled(decode_u64(value, kind)?),
        TYPE_ICE_CONTROLLING => Attribute::IceControlling(decode_u64(value, kind)?),
        TYPE_DATA => Attribute::Data(value.to_vec()),
        TYPE_CHANNEL_NUMBER => {
            if value.len() != 4 {
                return Err(Error::InvalidAttributeLength(kind));
            }
            Attribute::ChannelNumber(u16::from_be_bytes([value[0], value[1]]))
        }
        _ => Attribute::Unknown {
            kind,
            value: value.to_vec(),
        },
    })
}

fn decode_utf8(value: &[u8], kind: u16) -> Result<String> {
    String::from_utf8(value.to_vec()).map_err(|_| Error::InvalidAttributeLength(kind))
}

fn decode_u32(value: &[u8], kind: u16) -> Result<u32> {
    if value.len() != 4 {
        return Err(Error::InvalidAttributeLength(kind));
    }
    Ok(u32::from_be_bytes([value[0], value[1], value[2], value[3]]))
}

fn decode_u64(value: &[u8], kind: u16) -> Result<u64> {
    if value.len() != 8 {
        return Err(Error::InvalidAttributeLength(kind));
    }
    let mut b = [0u8; 8];
    b.copy_from_slice(value);
    Ok(u64::from_be_bytes(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn tid() -> [u8; 12] {
        [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
    }

    /// spec.md §8 property 1 + §8 S1: encode/decode round trip with
    /// integrity and fingerprint enabled.
    #[test]
    fn s1_binding_request_round_trip() {
        let msg = Message::new(METHOD_BINDING, Class::Request, tid())
            .with_attribute(Attribute::Username("a:b".to_string()))
            .with_attribute(Attribute::Priority(0x7e7f1eff))
            .with_attribute(Attribute::IceControlling(0x0102030405060708));

        let key = integrity::short_term_key("pw");
        let encoded = msg.encode(Some(&key), true).unwrap();
        let decoded = Message::decode(&encoded, Some(&key)).unwrap();

        assert_eq!(decoded.method, msg.method);
        assert_eq!(decoded.class, msg.class);
        assert_eq!(decoded.transaction_id, msg.transaction_id);
        assert_eq!(decoded.attributes, msg.attributes);
    }

    /// spec.md §8 property 1: a single bit flip inside the
    /// integrity-covered range must fail with IntegrityMismatch.
    #[test]
    fn bit_flip_breaks_integrity() {
        let msg = Message::new(METHOD_BINDING, Class::Request, tid())
            .with_attribute(Attribute::Username("a:b".to_string()));
        let key = integrity::short_term_key("pw");
        let encoded = msg.encode(Some(&key), false).unwrap();

        for bit in 0..encoded.len() * 8 {
            let mut flipped = encoded.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            let result = Message::decode(&flipped, Some(&key));
            assert!(
                result.is_err(),
                "bit {bit} flip should have broken the message"
            );
        }
    }

    #[test]
    fn fingerprint_bit_flip_detected() {
        let msg = Message::new(METHOD_BINDING, Class::Request, tid());
        let encoded = msg.encode(None, true).unwrap();
        for bit in 0..encoded.len() * 8 {
            let mut flipped = encoded.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            let result = Message::decode(&flipped, None);
            assert!(result.is_err());
        }
    }

    #[test]
    fn magic_cookie_mismatch_rejected() {
        let msg = Message::new(METHOD_BINDING, Class::Request, tid());
        let mut encoded = msg.encode(None, false).unwrap();
        encoded[4] ^= 0xff;
        assert_eq!(Message::decode(&encoded, None), Err(Error::MagicCookieMismatch));
    }

    #[test]
    fn fingerprint_must_be_last() {
        let key = integrity::short_term_key("pw");
        let msg = Message::new(METHOD_BINDING, Class::Request, tid())
            .with_attribute(Attribute::Username("x".into()));
        let mut encoded = msg.encode(Some(&key), true).unwrap();
        // Splice in an extra attribute after FINGERPRINT.
        let extra_kind = 0x9999u16;
        let mut extra = Vec::new();
        encode_tlv(&mut extra, extra_kind, b"hi");
        let total_len = u16::from_be_bytes([encoded[2], encoded[3]]) as usize + extra.len();
        encoded[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
        encoded.extend_from_slice(&extra);
        assert!(matches!(
            Message::decode(&encoded, Some(&key)),
            Err(Error::FingerprintNotLast)
        ));
    }

    #[test]
    fn address_attribute_round_trips() {
        let addr = SocketAddress::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5)), 3478);
        let msg = Message::new(METHOD_BINDING, Class::SuccessResponse, tid())
            .with_attribute(Attribute::XorMappedAddress(addr));
        let encoded = msg.encode(None, false).unwrap();
        let decoded = Message::decode(&encoded, None).unwrap();
        assert_eq!(decoded.attributes, msg.attributes);
    }
}
