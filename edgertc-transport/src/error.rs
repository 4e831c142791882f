use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Transport-layer error taxonomy (spec.md §4.4).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shared(#[from] shared::Error),
    #[error("rtcp codec error: {0}")]
    Rtcp(String),
    #[error("rtp codec error: {0}")]
    Rtp(String),

    #[error("datagram too short to classify")]
    EmptyDatagram,
    #[error("datagram's first byte falls outside the STUN/DTLS/SRTP ranges")]
    UndefinedDemuxClass,
    #[error("SRTP/SRTCP protection is not yet established")]
    NotEstablished,
    #[error("SRTP/SRTCP unprotect failed authentication")]
    UnprotectFailed,
    #[error("DTLS fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },
    #[error("unsupported SRTP protection profile {0:#06x}")]
    UnsupportedProfile(u16),
    #[error("exported keying material is {got} bytes, need at least {need}")]
    ShortKeyingMaterial { need: usize, got: usize },
}

impl From<rtcp::Error> for Error {
    fn from(e: rtcp::Error) -> Self {
        Error::Rtcp(e.to_string())
    }
}

impl From<rtp::Error> for Error {
    fn from(e: rtp::Error) -> Self {
        Error::Rtp(e.to_string())
    }
}
