//! Dispatches a raw RTCP datagram to its concrete packet type by
//! reading the shared header's payload type / feedback message type
//! (spec.md §4.6, §4.4 second-byte SRTCP sub-demux).

use crate::error::{Error, Result};
use crate::header::{self, Header};
use crate::nack::TransportLayerNack;
use crate::pli::PictureLossIndication;
use crate::receiver_report::ReceiverReport;
use crate::remb::ReceiverEstimatedMaximumBitrate;
use crate::sender_report::SenderReport;
use crate::twcc::TransportLayerCc;
use bytes::{Buf, Bytes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    Nack(TransportLayerNack),
    Pli(PictureLossIndication),
    Remb(ReceiverEstimatedMaximumBitrate),
    Twcc(TransportLayerCc),
}

impl Packet {
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let mut peek = data;
        let hdr = Header::unmarshal(&mut peek)?;
        match hdr.packet_type {
            header::pt::SENDER_REPORT => Ok(Packet::SenderReport(SenderReport::unmarshal(data)?)),
            header::pt::RECEIVER_REPORT => Ok(Packet::ReceiverReport(ReceiverReport::unmarshal(data)?)),
            header::pt::TRANSPORT_SPECIFIC_FEEDBACK if hdr.count == header::fmt::NACK => {
                Ok(Packet::Nack(TransportLayerNack::unmarshal(data)?))
            }
            header::pt::TRANSPORT_SPECIFIC_FEEDBACK if hdr.count == header::fmt::TWCC => {
                Ok(Packet::Twcc(TransportLayerCc::unmarshal(data)?))
            }
            header::pt::PAYLOAD_SPECIFIC_FEEDBACK if hdr.count == header::fmt::PLI => {
                Ok(Packet::Pli(PictureLossIndication::unmarshal(data)?))
            }
            header::pt::PAYLOAD_SPECIFIC_FEEDBACK if hdr.count == header::fmt::REMB => {
                Ok(Packet::Remb(ReceiverEstimatedMaximumBitrate::unmarshal(data)?))
            }
            pt => Err(Error::UnknownFeedbackFormat { pt, fmt: hdr.count }),
        }
    }

    pub fn marshal(&self) -> Result<Bytes> {
        match self {
            Packet::SenderReport(p) => p.marshal(),
            Packet::ReceiverReport(p) => p.marshal(),
            Packet::Nack(p) => p.marshal(),
            Packet::Pli(p) => p.marshal(),
            Packet::Remb(p) => p.marshal(),
            Packet::Twcc(p) => p.marshal(),
        }
    }
}

/// Splits a compound RTCP packet (several packets concatenated per
/// RFC 3550 §6.1) into its constituent datagrams.
pub fn split_compound(mut data: &[u8]) -> Result<Vec<Bytes>> {
    let mut parts = Vec::new();
    while data.remaining() >= header::SIZE {
        let mut peek = data;
        let hdr = Header::unmarshal(&mut peek)?;
        let total = (usize::from(hdr.length_words) + 1) * 4;
        if data.remaining() < total {
            return Err(Error::LengthMismatch {
                declared: total,
                available: data.remaining(),
            });
        }
        parts.push(Bytes::copy_from_slice(&data[..total]));
        data.advance(total);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reception_report::ReceptionReport;

    #[test]
    fn dispatches_sender_report() {
        let sr = SenderReport {
            ssrc: 1,
            ntp_time: 2,
            rtp_time: 3,
            packet_count: 4,
            octet_count: 5,
            reports: vec![],
            profile_extensions: Bytes::new(),
        };
        let encoded = sr.marshal().unwrap();
        assert_eq!(Packet::unmarshal(&encoded).unwrap(), Packet::SenderReport(sr));
    }

    #[test]
    fn splits_compound_sr_plus_rr() {
        let sr = SenderReport {
            ssrc: 1,
            ntp_time: 2,
            rtp_time: 3,
            packet_count: 4,
            octet_count: 5,
            reports: vec![ReceptionReport {
                ssrc: 9,
                fraction_lost: 0,
                total_lost: 0,
                last_sequence_number: 0,
                jitter: 0,
                last_sender_report: 0,
                delay_since_last_sr: 0,
            }],
            profile_extensions: Bytes::new(),
        };
        let rr = ReceiverReport {
            ssrc: 2,
            reports: vec![],
            profile_extensions: Bytes::new(),
        };
        let mut compound = Vec::new();
        compound.extend_from_slice(&sr.marshal().unwrap());
        compound.extend_from_slice(&rr.marshal().unwrap());

        let parts = split_compound(&compound).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(Packet::unmarshal(&parts[0]).unwrap(), Packet::SenderReport(sr));
        assert_eq!(Packet::unmarshal(&parts[1]).unwrap(), Packet::ReceiverReport(rr));
    }
}
