use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shared(#[from] shared::Error),
    #[error("ICE agent error: {0}")]
    Ice(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no transceiver is routed to SSRC {0}")]
    UnroutedSsrc(u32),
    #[error("SRTP/SRTCP session is not established yet")]
    NotEstablished,
    #[error("connection state cannot move from {from:?} to {to:?}")]
    IllegalStateTransition { from: crate::connection::ConnectionState, to: crate::connection::ConnectionState },
}

impl From<ice::Error> for Error {
    fn from(e: ice::Error) -> Self {
        Error::Ice(e.to_string())
    }
}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
