//! Reception report block shared by SR and RR (RFC 3550 §6.4.1).

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};

pub const SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceptionReport {
    pub ssrc: u32,
    pub fraction_lost: u8,
    /// Cumulative number of packets lost, a signed 24-bit value.
    pub total_lost: i32,
    pub last_sequence_number: u32,
    pub jitter: u32,
    pub last_sender_report: u32,
    pub delay_since_last_sr: u32,
}

impl ReceptionReport {
    pub fn unmarshal(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < SIZE {
            return Err(Error::HeaderTooShort);
        }
        let ssrc = buf.get_u32();
        let fraction_lost = buf.get_u8();
        let mut lost = [0u8; 4];
        lost[1] = buf.get_u8();
        lost[2] = buf.get_u8();
        lost[3] = buf.get_u8();
        let mut total_lost = i32::from_be_bytes(lost);
        if total_lost & 0x0080_0000 != 0 {
            total_lost -= 0x0100_0000;
        }
        let last_sequence_number = buf.get_u32();
        let jitter = buf.get_u32();
        let last_sender_report = buf.get_u32();
        let delay_since_last_sr = buf.get_u32();
        Ok(Self {
            ssrc,
            fraction_lost,
            total_lost,
            last_sequence_number,
            jitter,
            last_sender_report,
            delay_since_last_sr,
        })
    }

    pub fn marshal(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.ssrc);
        buf.put_u8(self.fraction_lost);
        let bytes = self.total_lost.to_be_bytes();
        buf.put_slice(&bytes[1..]);
        buf.put_u32(self.last_sequence_number);
        buf.put_u32(self.jitter);
        buf.put_u32(self.last_sender_report);
        buf.put_u32(self.delay_since_last_sr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn round_trips_negative_total_lost() {
        let rr = ReceptionReport {
            ssrc: 0xbc5e_9a40,
            fraction_lost: 10,
            total_lost: -5,
            last_sequence_number: 0x46e1,
            jitter: 273,
            last_sender_report: 0x9f36432,
            delay_since_last_sr: 150137,
        };
        let mut buf = BytesMut::new();
        rr.marshal(&mut buf);
        assert_eq!(buf.len(), SIZE);
        let mut reader = &buf[..];
        assert_eq!(ReceptionReport::unmarshal(&mut reader).unwrap(), rr);
    }
}
