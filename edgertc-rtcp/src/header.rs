//! RTCP common header (RFC 3550 §6.1), spec.md §4.6.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};

pub const VERSION: u8 = 2;
pub const SIZE: usize = 4;

pub mod pt {
    pub const SENDER_REPORT: u8 = 200;
    pub const RECEIVER_REPORT: u8 = 201;
    pub const SOURCE_DESCRIPTION: u8 = 202;
    pub const GOODBYE: u8 = 203;
    pub const APPLICATION_DEFINED: u8 = 204;
    pub const TRANSPORT_SPECIFIC_FEEDBACK: u8 = 205;
    pub const PAYLOAD_SPECIFIC_FEEDBACK: u8 = 206;
}

pub mod fmt {
    pub const NACK: u8 = 1;
    pub const TWCC: u8 = 15;
    pub const PLI: u8 = 1;
    pub const REMB: u8 = 15;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub padding: bool,
    /// Reception report count, source count, or feedback message type
    /// depending on `packet_type` (RFC 3550's overloaded 5-bit field).
    pub count: u8,
    pub packet_type: u8,
    /// Packet length in 32-bit words, including the header, minus one.
    pub length_words: u16,
}

impl Header {
    pub fn unmarshal(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < SIZE {
            return Err(Error::HeaderTooShort);
        }
        let b0 = buf.get_u8();
        let version = (b0 >> 6) & 0x03;
        if version != VERSION {
            return Err(Error::BadVersion(version));
        }
        let padding = b0 & 0x20 != 0;
        let count = b0 & 0x1f;
        let packet_type = buf.get_u8();
        let length_words = buf.get_u16();
        Ok(Self {
            padding,
            count,
            packet_type,
            length_words,
        })
    }

    pub fn marshal(&self, buf: &mut impl BufMut) {
        let mut b0 = (VERSION << 6) | (self.count & 0x1f);
        if self.padding {
            b0 |= 0x20;
        }
        buf.put_u8(b0);
        buf.put_u8(self.packet_type);
        buf.put_u16(self.length_words);
    }

    /// `length_words` for a packet whose total wire size (header
    /// included) is `total_bytes`.
    pub fn length_words_for(total_bytes: usize) -> u16 {
        ((total_bytes / 4) - 1) as u16
    }
}
