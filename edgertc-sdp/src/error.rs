use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("SDP line is missing its '=' separator: {0:?}")]
    MissingEquals(String),
    #[error("unknown media name: {0}")]
    UnknownMediaKind(String),
    #[error("m= line has too few fields: {0:?}")]
    MalformedMediaLine(String),
    #[error("unknown setup role: {0}")]
    UnknownSetupRole(String),
    #[error("fingerprint attribute has no algorithm/hex pair: {0:?}")]
    MalformedFingerprint(String),
    #[error("ssrc attribute has a non-numeric id: {0:?}")]
    MalformedSsrc(String),
}
