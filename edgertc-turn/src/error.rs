use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// TURN client error taxonomy (spec.md §4.2 "Failure semantics", §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shared(#[from] shared::Error),
    #[error(transparent)]
    Stun(#[from] stun::Error),

    #[error("TURN allocation failed: {0}")]
    AllocationFailed(String),
    #[error("failed to create permission for {0}")]
    CreatePermissionFailed(SocketAddr),
    #[error("failed to bind channel for {0}")]
    ChannelBindFailed(SocketAddr),
    #[error("allocation refresh failed: {0}")]
    RefreshFailed(String),
    #[error("no permission exists for peer {0}")]
    NoPermission(SocketAddr),
    #[error("client is closed")]
    Closed,
    #[error("server returned an unexpected response for this transaction")]
    UnexpectedResponse,
}
