//! Receiver Estimated Maximum Bitrate, PSFB FMT=15 "afb" (RFC not yet
//! final; draft-alvestrand-rmcat-remb), spec.md §4.6.

use crate::error::{Error, Result};
use crate::header::{self, Header};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const UNIQUE_IDENTIFIER: [u8; 4] = *b"REMB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverEstimatedMaximumBitrate {
    pub sender_ssrc: u32,
    pub ssrcs: Vec<u32>,
    /// Advisory bitrate in bits per second, encoded as mantissa·2^exponent.
    pub bitrate: u64,
}

fn encode_mantissa_exponent(bitrate: u64) -> (u8, u32) {
    let mut exponent = 0u8;
    let mut mantissa = bitrate;
    while mantissa > 0x3_ffff && exponent < 63 {
        mantissa >>= 1;
        exponent += 1;
    }
    (exponent, mantissa as u32)
}

impl ReceiverEstimatedMaximumBitrate {
    fn marshal_size(&self) -> usize {
        header::SIZE + 8 + 4 + 3 + self.ssrcs.len() * 4
    }

    pub fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.marshal_size());
        Header {
            padding: false,
            count: header::fmt::REMB,
            packet_type: header::pt::PAYLOAD_SPECIFIC_FEEDBACK,
            length_words: Header::length_words_for(self.marshal_size()),
        }
        .marshal(&mut buf);
        buf.put_u32(self.sender_ssrc);
        buf.put_u32(0); // media SSRC is always zero for REMB
        buf.put_slice(&UNIQUE_IDENTIFIER);
        buf.put_u8(self.ssrcs.len() as u8);

        let (exponent, mantissa) = encode_mantissa_exponent(self.bitrate);
        buf.put_u8((exponent << 2) | ((mantissa >> 16) as u8 & 0x03));
        buf.put_u8((mantissa >> 8) as u8);
        buf.put_u8(mantissa as u8);

        for ssrc in &self.ssrcs {
            buf.put_u32(*ssrc);
        }
        Ok(buf.freeze())
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let hdr = Header::unmarshal(&mut buf)?;
        if hdr.packet_type != header::pt::PAYLOAD_SPECIFIC_FEEDBACK || hdr.count != header::fmt::REMB {
            return Err(Error::UnknownFeedbackFormat {
                pt: hdr.packet_type,
                fmt: hdr.count,
            });
        }
        if buf.remaining() < 12 {
            return Err(Error::HeaderTooShort);
        }
        let sender_ssrc = buf.get_u32();
        let _media_ssrc = buf.get_u32();
        let mut identifier = [0u8; 4];
        buf.copy_to_slice(&mut identifier);
        if identifier != UNIQUE_IDENTIFIER {
            return Err(Error::NotRemb);
        }
        let num_ssrc = buf.get_u8() as usize;
        let b0 = buf.get_u8();
        let b1 = buf.get_u8();
        let b2 = buf.get_u8();
        let exponent = b0 >> 2;
        let mantissa = (u32::from(b0 & 0x03) << 16) | (u32::from(b1) << 8) | u32::from(b2);
        let bitrate = u64::from(mantissa) << exponent;

        if buf.remaining() < num_ssrc * 4 {
            return Err(Error::HeaderTooShort);
        }
        let ssrcs = (0..num_ssrc).map(|_| buf.get_u32()).collect();

        Ok(Self {
            sender_ssrc,
            ssrcs,
            bitrate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bitrate_advisory() {
        let remb = ReceiverEstimatedMaximumBitrate {
            sender_ssrc: 0x1234,
            ssrcs: vec![0xaabb_ccdd],
            bitrate: 2_500_000,
        };
        let encoded = remb.marshal().unwrap();
        let decoded = ReceiverEstimatedMaximumBitrate::unmarshal(&encoded).unwrap();
        assert_eq!(decoded.sender_ssrc, remb.sender_ssrc);
        assert_eq!(decoded.ssrcs, remb.ssrcs);
        // Mantissa/exponent encoding is lossy above 18 bits of precision.
        assert!(decoded.bitrate.abs_diff(remb.bitrate) < (1 << 6));
    }
}
