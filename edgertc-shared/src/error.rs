use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Cross-cutting errors (spec.md §7 "Input") shared by every crate in
/// the workspace. Crate-specific taxonomies (STUN, ICE, RTP, ...) live
/// in their own `Error` enum and wrap this one with `#[from]` where a
/// lower layer's failure needs to surface unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("null argument")]
    NullArgument,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("buffer too small: need {needed}, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("not enough memory")]
    NotEnoughMemory,
    #[error("{0}")]
    Other(String),
}
