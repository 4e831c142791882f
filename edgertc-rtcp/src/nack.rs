//! Generic NACK, RTPFB FMT=1 (RFC 4585 §6.2.1), spec.md §4.5/§4.6.

use crate::error::{Error, Result};
use crate::header::{self, Header};
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NackPair {
    /// Packet ID: sequence number of the first packet lost.
    pub packet_id: u16,
    /// Bitmask of following packets lost, bit N set means `packet_id + N + 1`.
    pub lost_packets: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportLayerNack {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub nacks: Vec<NackPair>,
}

impl TransportLayerNack {
    pub fn marshal_size(&self) -> usize {
        header::SIZE + 8 + self.nacks.len() * 4
    }

    pub fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.marshal_size());
        Header {
            padding: false,
            count: header::fmt::NACK,
            packet_type: header::pt::TRANSPORT_SPECIFIC_FEEDBACK,
            length_words: Header::length_words_for(self.marshal_size()),
        }
        .marshal(&mut buf);
        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        for nack in &self.nacks {
            buf.put_u16(nack.packet_id);
            buf.put_u16(nack.lost_packets);
        }
        Ok(buf.freeze())
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let hdr = Header::unmarshal(&mut buf)?;
        if hdr.packet_type != header::pt::TRANSPORT_SPECIFIC_FEEDBACK || hdr.count != header::fmt::NACK {
            return Err(Error::UnknownFeedbackFormat {
                pt: hdr.packet_type,
                fmt: hdr.count,
            });
        }
        if buf.remaining() < 8 {
            return Err(Error::HeaderTooShort);
        }
        let sender_ssrc = buf.get_u32();
        let media_ssrc = buf.get_u32();
        let mut nacks = Vec::new();
        while buf.remaining() >= 4 {
            nacks.push(NackPair {
                packet_id: buf.get_u16(),
                lost_packets: buf.get_u16(),
            });
        }
        Ok(Self {
            sender_ssrc,
            media_ssrc,
            nacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S4: PID=7003, BLP=0x0005 (bits 0 and 2 set).
    #[test]
    fn round_trips_s4_nack() {
        let nack = TransportLayerNack {
            sender_ssrc: 1,
            media_ssrc: 2,
            nacks: vec![NackPair {
                packet_id: 7003,
                lost_packets: 0x0005,
            }],
        };
        let encoded = nack.marshal().unwrap();
        assert_eq!(TransportLayerNack::unmarshal(&encoded).unwrap(), nack);
    }
}
