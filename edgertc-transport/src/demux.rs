//! Byte-prefix demultiplexer for a socket shared by STUN, DTLS, and
//! SRTP/SRTCP traffic (spec.md §4.4).

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxClass {
    Stun,
    Dtls,
    Srtcp,
    Srtp,
    /// First byte falls outside all three defined ranges (spec.md
    /// §4.4/§8 testable property 8 names "drop" as a fourth, distinct
    /// outcome rather than folding it into SRTP).
    Unknown,
}

/// Classifies an inbound datagram by its first one or two bytes.
pub fn classify(data: &[u8]) -> Result<DemuxClass> {
    let first = *data.first().ok_or(Error::EmptyDatagram)?;
    match first {
        0..=1 => Ok(DemuxClass::Stun),
        19..=63 => Ok(DemuxClass::Dtls),
        127..=191 => {
            let second = data.get(1).copied().unwrap_or(0);
            if (192..=223).contains(&second) {
                Ok(DemuxClass::Srtcp)
            } else {
                Ok(DemuxClass::Srtp)
            }
        }
        _ => Ok(DemuxClass::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_stun() {
        assert_eq!(classify(&[0x00, 0x01]).unwrap(), DemuxClass::Stun);
        assert_eq!(classify(&[0x01, 0x01]).unwrap(), DemuxClass::Stun);
    }

    #[test]
    fn classifies_dtls() {
        assert_eq!(classify(&[19, 0]).unwrap(), DemuxClass::Dtls);
        assert_eq!(classify(&[63, 0]).unwrap(), DemuxClass::Dtls);
    }

    #[test]
    fn classifies_srtcp_vs_srtp() {
        assert_eq!(classify(&[127, 200]).unwrap(), DemuxClass::Srtcp);
        assert_eq!(classify(&[191, 223]).unwrap(), DemuxClass::Srtcp);
        assert_eq!(classify(&[127, 96]).unwrap(), DemuxClass::Srtp);
    }

    #[test]
    fn classifies_undefined_ranges_as_unknown() {
        assert_eq!(classify(&[10, 0]).unwrap(), DemuxClass::Unknown);
        assert_eq!(classify(&[64, 0]).unwrap(), DemuxClass::Unknown);
        assert_eq!(classify(&[100, 0]).unwrap(), DemuxClass::Unknown);
        assert_eq!(classify(&[255, 0]).unwrap(), DemuxClass::Unknown);
    }

    #[test]
    fn rejects_empty_datagram() {
        assert_eq!(classify(&[]), Err(Error::EmptyDatagram));
    }
}
