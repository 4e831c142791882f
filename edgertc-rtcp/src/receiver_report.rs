//! RTCP Receiver Report (RFC 3550 §6.4.2), spec.md §4.6.

use crate::error::{Error, Result};
use crate::header::{self, Header};
use crate::reception_report::ReceptionReport;
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverReport {
    pub ssrc: u32,
    pub reports: Vec<ReceptionReport>,
    pub profile_extensions: Bytes,
}

impl ReceiverReport {
    pub fn marshal_size(&self) -> usize {
        header::SIZE + 4 + self.reports.len() * crate::reception_report::SIZE + self.profile_extensions.len()
    }

    pub fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.marshal_size());
        Header {
            padding: false,
            count: self.reports.len() as u8,
            packet_type: header::pt::RECEIVER_REPORT,
            length_words: Header::length_words_for(self.marshal_size()),
        }
        .marshal(&mut buf);
        buf.put_u32(self.ssrc);
        for report in &self.reports {
            report.marshal(&mut buf);
        }
        buf.put_slice(&self.profile_extensions);
        Ok(buf.freeze())
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let hdr = Header::unmarshal(&mut buf)?;
        if hdr.packet_type != header::pt::RECEIVER_REPORT {
            return Err(Error::UnknownPacketType(hdr.packet_type));
        }
        if buf.remaining() < 4 {
            return Err(Error::HeaderTooShort);
        }
        let ssrc = buf.get_u32();
        let mut reports = Vec::with_capacity(hdr.count as usize);
        for _ in 0..hdr.count {
            reports.push(ReceptionReport::unmarshal(&mut buf)?);
        }
        let profile_extensions = Bytes::copy_from_slice(buf.chunk());
        Ok(Self {
            ssrc,
            reports,
            profile_extensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_no_reports() {
        let rr = ReceiverReport {
            ssrc: 0x902f_9e2e,
            reports: vec![],
            profile_extensions: Bytes::new(),
        };
        let encoded = rr.marshal().unwrap();
        assert_eq!(ReceiverReport::unmarshal(&encoded).unwrap(), rr);
    }
}
