use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Socket and resolution error taxonomy (spec.md §4 "L4 Network primitives", §7).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shared(#[from] shared::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no address resolved for {0}")]
    NoAddressResolved(String),

    #[error("socket connection for {0} is not registered")]
    UnknownConnection(std::net::SocketAddr),
}
