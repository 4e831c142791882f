//! RTCP Sender Report (RFC 3550 §6.4.1), spec.md §4.6.

use crate::error::{Error, Result};
use crate::header::{self, Header};
use crate::reception_report::ReceptionReport;
use bytes::{Buf, BufMut, Bytes, BytesMut};

const FIXED_BODY: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderReport {
    pub ssrc: u32,
    /// 64-bit NTP timestamp at the moment this report was sent.
    pub ntp_time: u64,
    /// RTP timestamp corresponding to `ntp_time` on the media clock.
    pub rtp_time: u32,
    pub packet_count: u32,
    pub octet_count: u32,
    pub reports: Vec<ReceptionReport>,
    pub profile_extensions: Bytes,
}

impl SenderReport {
    pub fn marshal_size(&self) -> usize {
        header::SIZE + FIXED_BODY + self.reports.len() * crate::reception_report::SIZE + self.profile_extensions.len()
    }

    pub fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.marshal_size());
        Header {
            padding: false,
            count: self.reports.len() as u8,
            packet_type: header::pt::SENDER_REPORT,
            length_words: Header::length_words_for(self.marshal_size()),
        }
        .marshal(&mut buf);
        buf.put_u32(self.ssrc);
        buf.put_u32((self.ntp_time >> 32) as u32);
        buf.put_u32(self.ntp_time as u32);
        buf.put_u32(self.rtp_time);
        buf.put_u32(self.packet_count);
        buf.put_u32(self.octet_count);
        for report in &self.reports {
            report.marshal(&mut buf);
        }
        buf.put_slice(&self.profile_extensions);
        Ok(buf.freeze())
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let hdr = Header::unmarshal(&mut buf)?;
        if hdr.packet_type != header::pt::SENDER_REPORT {
            return Err(Error::UnknownPacketType(hdr.packet_type));
        }
        if buf.remaining() < FIXED_BODY {
            return Err(Error::HeaderTooShort);
        }
        let ssrc = buf.get_u32();
        let ntp_time = (u64::from(buf.get_u32()) << 32) | u64::from(buf.get_u32());
        let rtp_time = buf.get_u32();
        let packet_count = buf.get_u32();
        let octet_count = buf.get_u32();

        let mut reports = Vec::with_capacity(hdr.count as usize);
        for _ in 0..hdr.count {
            reports.push(ReceptionReport::unmarshal(&mut buf)?);
        }
        let profile_extensions = Bytes::copy_from_slice(buf.chunk());

        Ok(Self {
            ssrc,
            ntp_time,
            rtp_time,
            packet_count,
            octet_count,
            reports,
            profile_extensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_reports_and_extensions() {
        let sr = SenderReport {
            ssrc: 0x902f_9e2e,
            ntp_time: 0xda8b_d1fc_dddd_a05a,
            rtp_time: 0xaaf4_edd5,
            packet_count: 1000,
            octet_count: 50000,
            reports: vec![ReceptionReport {
                ssrc: 0xbc5e_9a40,
                fraction_lost: 10,
                total_lost: 100,
                last_sequence_number: 0x46e1,
                jitter: 273,
                last_sender_report: 0x9f3_6432,
                delay_since_last_sr: 150137,
            }],
            profile_extensions: Bytes::new(),
        };
        let encoded = sr.marshal().unwrap();
        assert_eq!(encoded.len(), sr.marshal_size());
        assert_eq!(SenderReport::unmarshal(&encoded).unwrap(), sr);
    }
}
