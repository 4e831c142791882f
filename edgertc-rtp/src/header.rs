//! RTP fixed header codec (RFC 3550 §5.1), spec.md §3 "RTP packet".
//! Grounded on the module layout `rtc-rtp/src/lib.rs` declares
//! (`pub mod header`), reimplemented against this workspace's `bytes`/
//! `shared::Error` conventions instead of the teacher's (unretrieved)
//! body.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};

const VERSION: u8 = 2;
const FIXED_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub profile: u16,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub padding: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension: Option<Extension>,
}

impl Header {
    pub fn marshal_size(&self) -> usize {
        let mut size = FIXED_LEN + self.csrc.len() * 4;
        if let Some(ext) = &self.extension {
            size += 4 + ext.payload.len();
        }
        size
    }

    pub fn marshal(&self, buf: &mut impl BufMut) -> Result<()> {
        if self.csrc.len() > 15 {
            return Err(Error::TooManyCsrc(self.csrc.len()));
        }
        if let Some(ext) = &self.extension {
            if ext.payload.len() % 4 != 0 {
                return Err(Error::MisalignedExtension(ext.payload.len()));
            }
        }

        let mut b0 = (VERSION << 6) | self.csrc.len() as u8;
        if self.padding {
            b0 |= 0b0010_0000;
        }
        if self.extension.is_some() {
            b0 |= 0b0001_0000;
        }
        buf.put_u8(b0);

        let mut b1 = self.payload_type & 0x7f;
        if self.marker {
            b1 |= 0x80;
        }
        buf.put_u8(b1);

        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
        for csrc in &self.csrc {
            buf.put_u32(*csrc);
        }

        if let Some(ext) = &self.extension {
            buf.put_u16(ext.profile);
            buf.put_u16((ext.payload.len() / 4) as u16);
            buf.put_slice(&ext.payload);
        }

        Ok(())
    }

    pub fn unmarshal(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < FIXED_LEN {
            return Err(Error::HeaderTooShort);
        }
        let b0 = buf.get_u8();
        let padding = b0 & 0b0010_0000 != 0;
        let has_extension = b0 & 0b0001_0000 != 0;
        let csrc_count = (b0 & 0x0f) as usize;

        let b1 = buf.get_u8();
        let marker = b1 & 0x80 != 0;
        let payload_type = b1 & 0x7f;

        let sequence_number = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        if buf.remaining() < csrc_count * 4 {
            return Err(Error::HeaderTooShort);
        }
        let csrc = (0..csrc_count).map(|_| buf.get_u32()).collect();

        let extension = if has_extension {
            if buf.remaining() < 4 {
                return Err(Error::HeaderTooShort);
            }
            let profile = buf.get_u16();
            let len_words = buf.get_u16() as usize;
            let len_bytes = len_words * 4;
            if buf.remaining() < len_bytes {
                return Err(Error::HeaderTooShort);
            }
            let mut payload = vec![0u8; len_bytes];
            buf.copy_to_slice(&mut payload);
            Some(Extension { profile, payload })
        } else {
            None
        };

        Ok(Self {
            padding,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BytesMut, BufMut};

    fn header(csrc_count: usize, ext_len: usize) -> Header {
        Header {
            padding: false,
            marker: true,
            payload_type: 96,
            sequence_number: 4242,
            timestamp: 0xdead_beef,
            ssrc: 0x1234_5678,
            csrc: (0..csrc_count as u32).collect(),
            extension: if ext_len > 0 {
                Some(Extension {
                    profile: 0xBEDE,
                    payload: vec![0xAB; ext_len],
                })
            } else {
                None
            },
        }
    }

    #[test]
    fn round_trips_with_max_csrc_and_aligned_extension() {
        for csrc_count in [0usize, 1, 15] {
            for ext_len in [0usize, 4, 8] {
                let h = header(csrc_count, ext_len);
                let mut buf = BytesMut::new();
                h.marshal(&mut buf).unwrap();
                let mut reader = &buf[..];
                let decoded = Header::unmarshal(&mut reader).unwrap();
                assert_eq!(decoded, h);
            }
        }
    }

    #[test]
    fn rejects_too_many_csrc() {
        let h = header(16, 0);
        let mut buf = BytesMut::new();
        assert_eq!(h.marshal(&mut buf), Err(Error::TooManyCsrc(16)));
    }

    #[test]
    fn rejects_truncated_header() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x80);
        let mut reader = &buf[..];
        assert_eq!(Header::unmarshal(&mut reader), Err(Error::HeaderTooShort));
    }
}
