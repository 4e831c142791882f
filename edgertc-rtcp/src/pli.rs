//! Picture Loss Indication, PSFB FMT=1 (RFC 4585 §6.3.1), spec.md §4.6.

use crate::error::{Error, Result};
use crate::header::{self, Header};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const SIZE: usize = header::SIZE + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureLossIndication {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
}

impl PictureLossIndication {
    pub fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(SIZE);
        Header {
            padding: false,
            count: header::fmt::PLI,
            packet_type: header::pt::PAYLOAD_SPECIFIC_FEEDBACK,
            length_words: Header::length_words_for(SIZE),
        }
        .marshal(&mut buf);
        buf.put_u32(self.sender_ssrc);
        buf.put_u32(self.media_ssrc);
        Ok(buf.freeze())
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let hdr = Header::unmarshal(&mut buf)?;
        if hdr.packet_type != header::pt::PAYLOAD_SPECIFIC_FEEDBACK || hdr.count != header::fmt::PLI {
            return Err(Error::UnknownFeedbackFormat {
                pt: hdr.packet_type,
                fmt: hdr.count,
            });
        }
        if buf.remaining() < 8 {
            return Err(Error::HeaderTooShort);
        }
        Ok(Self {
            sender_ssrc: buf.get_u32(),
            media_ssrc: buf.get_u32(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let pli = PictureLossIndication {
            sender_ssrc: 11,
            media_ssrc: 22,
        };
        let encoded = pli.marshal().unwrap();
        assert_eq!(PictureLossIndication::unmarshal(&encoded).unwrap(), pli);
    }
}
