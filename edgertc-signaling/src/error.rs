use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Signaling error taxonomy (spec.md §7's "Signaling" list).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("signaling client is not in a ready state for this call")]
    InvalidReadyState,
    #[error("get-credentials call failed")]
    GetTokenCallFailed,
    #[error("describe call failed")]
    DescribeCallFailed,
    #[error("create call failed")]
    CreateCallFailed,
    #[error("get-endpoint call failed")]
    GetEndpointCallFailed,
    #[error("get-ice-config call failed")]
    GetIceConfigCallFailed,
    #[error("connect call failed")]
    ConnectCallFailed,
    #[error("delete call failed")]
    DeleteCallFailed,
    #[error("operation timed out")]
    OperationTimedOut,
    #[error("I/O error reading or writing the signaling cache file: {0}")]
    Cache(String),
}
