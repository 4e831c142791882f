//! A full RTP packet: header plus payload (spec.md §3 "RTP packet").

use crate::error::Result;
use crate::header::Header;
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
}

impl Packet {
    pub fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.header.marshal_size() + self.payload.len());
        self.header.marshal(&mut buf)?;
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut reader = data;
        let header = Header::unmarshal(&mut reader)?;
        let payload = Bytes::copy_from_slice(reader.chunk());
        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Extension;

    #[test]
    fn packet_round_trips() {
        let packet = Packet {
            header: Header {
                padding: false,
                marker: false,
                payload_type: 111,
                sequence_number: 1,
                timestamp: 1000,
                ssrc: 0x1111_2222,
                csrc: vec![],
                extension: Some(Extension {
                    profile: 0xBEDE,
                    payload: vec![1, 2, 3, 4],
                }),
            },
            payload: Bytes::from_static(b"opus-frame"),
        };
        let encoded = packet.marshal().unwrap();
        let decoded = Packet::unmarshal(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }
}
