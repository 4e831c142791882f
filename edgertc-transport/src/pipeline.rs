//! Glues the byte-prefix demux and SRTP/SRTCP protection into the
//! single step the peer connection's inbound path needs (spec.md
//! §4.4, §4.7).

use crate::demux::{classify, DemuxClass};
use crate::error::{Error, Result};
use crate::srtp::SrtpContext;
use bytes::Bytes;
use rtcp::Packet as RtcpPacket;
use rtp::Packet as RtpPacket;

#[derive(Debug)]
pub enum Demuxed {
    Stun(Bytes),
    Dtls(Bytes),
    Rtp(RtpPacket),
    Rtcp(Vec<RtcpPacket>),
}

/// Classifies an inbound datagram and, for SRTP/SRTCP, unprotects and
/// parses it. STUN/DTLS datagrams are returned unparsed for their
/// respective owners (ICE agent, DTLS session) to handle.
pub fn demux_and_unprotect(srtp: &mut SrtpContext, data: &[u8]) -> Result<Demuxed> {
    match classify(data)? {
        DemuxClass::Stun => Ok(Demuxed::Stun(Bytes::copy_from_slice(data))),
        DemuxClass::Dtls => Ok(Demuxed::Dtls(Bytes::copy_from_slice(data))),
        DemuxClass::Srtp => {
            let peek = RtpPacket::unmarshal(data)?;
            let header_len = peek.header.marshal_size();
            let plaintext = srtp.unprotect(peek.header.ssrc, peek.header.sequence_number, header_len, data)?;
            Ok(Demuxed::Rtp(RtpPacket::unmarshal(&plaintext)?))
        }
        DemuxClass::Srtcp => {
            const RTCP_HEADER_LEN: usize = 8; // common header (4) + sender SSRC (4)
            if data.len() < RTCP_HEADER_LEN + 4 + crate::srtp::TAG_LEN {
                return Err(crate::error::Error::UnprotectFailed);
            }
            let header = &data[..RTCP_HEADER_LEN];
            let ssrc = u32::from_be_bytes(header[4..8].try_into().unwrap());

            let index_offset = data.len() - 4;
            let srtcp_index = u32::from_be_bytes(data[index_offset..].try_into().unwrap()) & 0x7fff_ffff;

            let plaintext = srtp.unprotect_rtcp(ssrc, srtcp_index, header.len(), &data[..index_offset])?;
            let parts = rtcp::split_compound(&plaintext)?;
            let packets = parts.iter().map(|p| RtcpPacket::unmarshal(p)).collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Demuxed::Rtcp(packets))
        }
        DemuxClass::Unknown => Err(Error::UndefinedDemuxClass),
    }
}
