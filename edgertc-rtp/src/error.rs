use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// RTP/jitter-buffer/rolling-buffer error taxonomy (spec.md §4.5, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shared(#[from] shared::Error),

    #[error("RTP packet shorter than the fixed 12-byte header")]
    HeaderTooShort,
    #[error("CSRC count {0} exceeds the 15 slots a 4-bit field can address")]
    TooManyCsrc(usize),
    #[error("extension length {0} is not a multiple of 4 bytes")]
    MisalignedExtension(usize),
    #[error("buffer is closed")]
    Closed,
}
