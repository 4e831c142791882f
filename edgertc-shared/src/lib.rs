#![warn(rust_2018_idioms)]

//! Types shared across the edgertc crate family: the transmit/transport
//! envelope the sans-I/O components speak, the address model from the
//! data model (§3 "IP address"), the credential provider trait, and the
//! common error base.

pub mod addr;
pub mod credential;
pub mod error;
pub mod transport;

pub use addr::SocketAddress;
pub use error::{Error, Result};
pub use transport::{
    EcnCodepoint, FiveTuple, FourTuple, TaggedBytesMut, TransportContext, TransportMessage,
    TransportProtocol,
};
