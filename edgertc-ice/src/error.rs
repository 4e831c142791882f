use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// ICE agent error taxonomy (spec.md §4.3, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shared(#[from] shared::Error),
    #[error(transparent)]
    Stun(#[from] stun::Error),

    #[error("unparsable remote candidate line: {0}")]
    InvalidCandidateLine(String),
    #[error("TCP candidates are not supported")]
    TcpCandidateRejected,
    #[error("no candidate pair for transaction")]
    UnknownTransaction,
    #[error("unknown candidate pair: local {0} <-> remote {1}")]
    UnknownPair(usize, usize),
    #[error("connectivity checks failed for every pair")]
    AllChecksFailed,
    #[error("ICE failed: disconnection grace period elapsed without recovery")]
    DisconnectTimeout,
}
