//! Transport-wide congestion control feedback, RTPFB FMT=15
//! (draft-holmer-rmcat-transport-wide-cc-extensions-01), spec.md §4.6.
//!
//! Decoding understands both packet-chunk encodings the draft defines
//! (run-length and 1-bit/2-bit status vectors); encoding only emits
//! run-length chunks, which is sufficient to represent any status
//! sequence and is what this workspace needs to produce outbound.

use crate::error::{Error, Result};
use crate::header::{self, Header};
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStatus {
    NotReceived,
    SmallDelta,
    LargeOrNegativeDelta,
}

impl PacketStatus {
    fn symbol(self) -> u16 {
        match self {
            PacketStatus::NotReceived => 0,
            PacketStatus::SmallDelta => 1,
            PacketStatus::LargeOrNegativeDelta => 2,
        }
    }

    fn from_symbol(symbol: u16) -> Result<Self> {
        match symbol {
            0 => Ok(PacketStatus::NotReceived),
            1 => Ok(PacketStatus::SmallDelta),
            2 => Ok(PacketStatus::LargeOrNegativeDelta),
            _ => Err(Error::MalformedTwcc),
        }
    }
}

/// Per-packet arrival delta, in 250 µs ticks. `None` is the sentinel
/// for a packet that was never received.
pub type Delta = Option<i32>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportLayerCc {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub base_sequence_number: u16,
    /// 24-bit signed reference time, in 64 ms units.
    pub reference_time: i32,
    pub fb_pkt_count: u8,
    pub statuses: Vec<PacketStatus>,
    pub deltas: Vec<Delta>,
}

impl TransportLayerCc {
    pub fn marshal(&self) -> Result<Bytes> {
        let mut chunks = BytesMut::new();
        let mut i = 0;
        while i < self.statuses.len() {
            let symbol = self.statuses[i].symbol();
            let mut run_len = 1usize;
            while i + run_len < self.statuses.len() && self.statuses[i + run_len].symbol() == symbol && run_len < 0x1fff {
                run_len += 1;
            }
            let chunk = (symbol << 13) | (run_len as u16 & 0x1fff);
            chunks.put_u16(chunk);
            i += run_len;
        }

        let mut deltas = BytesMut::new();
        for (status, delta) in self.statuses.iter().zip(self.deltas.iter()) {
            match (status, delta) {
                (PacketStatus::SmallDelta, Some(d)) => deltas.put_u8(*d as u8),
                (PacketStatus::LargeOrNegativeDelta, Some(d)) => deltas.put_i16(*d as i16),
                (PacketStatus::NotReceived, _) => {}
                _ => return Err(Error::MalformedTwcc),
            }
        }
        while deltas.len() % 4 != 0 {
            deltas.put_u8(0);
        }

        let body_len = 8 + 2 + 2 + 3 + 1 + chunks.len() + deltas.len();
        let total = header::SIZE + body_len;
        let mut buf = BytesMut::with_capacity(total);
        Header {
            padding: false,
            count: header::fmt::TWCC,
            packet_type: header::pt::TRANSPORT_SPECIFIC_FEEDBACK,
            length_words: Header::length_words_for(total),
        }
        .marshal(&mut buf);
        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        buf.put_u16(self.base_sequence_number);
        buf.put_u16(self.statuses.len() as u16);
        let rt = self.reference_time.to_be_bytes();
        buf.put_slice(&rt[1..]);
        buf.put_u8(self.fb_pkt_count);
        buf.put_slice(&chunks);
        buf.put_slice(&deltas);

        Ok(buf.freeze())
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let hdr = Header::unmarshal(&mut buf)?;
        if hdr.packet_type != header::pt::TRANSPORT_SPECIFIC_FEEDBACK || hdr.count != header::fmt::TWCC {
            return Err(Error::UnknownFeedbackFormat {
                pt: hdr.packet_type,
                fmt: hdr.count,
            });
        }
        if buf.remaining() < 16 {
            return Err(Error::HeaderTooShort);
        }
        let sender_ssrc = buf.get_u32();
        let media_ssrc = buf.get_u32();
        let base_sequence_number = buf.get_u16();
        let packet_status_count = buf.get_u16() as usize;
        let mut rt = [0u8; 4];
        rt[1] = buf.get_u8();
        rt[2] = buf.get_u8();
        rt[3] = buf.get_u8();
        let mut reference_time = i32::from_be_bytes(rt);
        if reference_time & 0x0080_0000 != 0 {
            reference_time -= 0x0100_0000;
        }
        let fb_pkt_count = buf.get_u8();

        let mut statuses = Vec::with_capacity(packet_status_count);
        while statuses.len() < packet_status_count {
            if buf.remaining() < 2 {
                return Err(Error::MalformedTwcc);
            }
            let chunk = buf.get_u16();
            if chunk & 0x8000 == 0 {
                // Run-length chunk: 2-bit symbol, 13-bit run length.
                let symbol = PacketStatus::from_symbol((chunk >> 13) & 0x03)?;
                let run_len = (chunk & 0x1fff) as usize;
                for _ in 0..run_len {
                    if statuses.len() >= packet_status_count {
                        break;
                    }
                    statuses.push(symbol);
                }
            } else if chunk & 0x4000 == 0 {
                // 1-bit status vector: 14 symbols, NotReceived/SmallDelta only.
                for bit in (0..14).rev() {
                    if statuses.len() >= packet_status_count {
                        break;
                    }
                    let symbol = (chunk >> bit) & 0x01;
                    statuses.push(PacketStatus::from_symbol(symbol)?);
                }
            } else {
                // 2-bit status vector: 7 symbols.
                for slot in (0..7).rev() {
                    if statuses.len() >= packet_status_count {
                        break;
                    }
                    let symbol = (chunk >> (slot * 2)) & 0x03;
                    statuses.push(PacketStatus::from_symbol(symbol)?);
                }
            }
        }

        let mut deltas = Vec::with_capacity(statuses.len());
        for status in &statuses {
            match status {
                PacketStatus::NotReceived => deltas.push(None),
                PacketStatus::SmallDelta => {
                    if buf.remaining() < 1 {
                        return Err(Error::MalformedTwcc);
                    }
                    deltas.push(Some(i32::from(buf.get_u8())));
                }
                PacketStatus::LargeOrNegativeDelta => {
                    if buf.remaining() < 2 {
                        return Err(Error::MalformedTwcc);
                    }
                    deltas.push(Some(i32::from(buf.get_i16())));
                }
            }
        }

        Ok(Self {
            sender_ssrc,
            media_ssrc,
            base_sequence_number,
            reference_time,
            fb_pkt_count,
            statuses,
            deltas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_via_run_length_chunks() {
        let twcc = TransportLayerCc {
            sender_ssrc: 1,
            media_ssrc: 2,
            base_sequence_number: 1000,
            reference_time: -42,
            fb_pkt_count: 7,
            statuses: vec![
                PacketStatus::SmallDelta,
                PacketStatus::SmallDelta,
                PacketStatus::NotReceived,
                PacketStatus::LargeOrNegativeDelta,
            ],
            deltas: vec![Some(4), Some(8), None, Some(-1000)],
        };
        let encoded = twcc.marshal().unwrap();
        assert_eq!(TransportLayerCc::unmarshal(&encoded).unwrap(), twcc);
    }

    #[test]
    fn decodes_two_bit_status_vector_chunk() {
        // chunk = 1 1 | 01 01 10 00 00 00 00 -> symbols [1,1,2,0,0,0,0]
        let chunk: u16 = 0b1_1_01_01_10_00_00_00_00u16 & 0x7fff | 0x8000 | 0x4000;
        let mut body = BytesMut::new();
        Header {
            padding: false,
            count: header::fmt::TWCC,
            packet_type: header::pt::TRANSPORT_SPECIFIC_FEEDBACK,
            length_words: 0,
        }
        .marshal(&mut body);
        body.put_u32(1);
        body.put_u32(2);
        body.put_u16(0);
        body.put_u16(3); // only first 3 symbols matter: SmallDelta, SmallDelta, LargeOrNegativeDelta
        body.put_slice(&[0, 0, 0]);
        body.put_u8(0);
        body.put_u16(chunk);
        body.put_u8(5); // small delta
        body.put_u8(6); // small delta
        body.put_i16(-1); // large/negative delta

        let decoded = TransportLayerCc::unmarshal(&body).unwrap();
        assert_eq!(
            decoded.statuses,
            vec![PacketStatus::SmallDelta, PacketStatus::SmallDelta, PacketStatus::LargeOrNegativeDelta]
        );
        assert_eq!(decoded.deltas, vec![Some(5), Some(6), Some(-1)]);
    }
}
