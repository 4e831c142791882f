use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// RTCP codec error taxonomy (spec.md §4.6).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shared(#[from] shared::Error),

    #[error("RTCP packet shorter than the fixed 4-byte header")]
    HeaderTooShort,
    #[error("unsupported RTCP version {0}")]
    BadVersion(u8),
    #[error("RTCP packet declares length {declared} words but only {available} are present")]
    LengthMismatch { declared: usize, available: usize },
    #[error("unrecognized RTCP payload type {0}")]
    UnknownPacketType(u8),
    #[error("unrecognized feedback message type {fmt} for payload type {pt}")]
    UnknownFeedbackFormat { pt: u8, fmt: u8 },
    #[error("REMB packet missing the 'REMB' unique identifier")]
    NotRemb,
    #[error("malformed TWCC chunk")]
    MalformedTwcc,
}
