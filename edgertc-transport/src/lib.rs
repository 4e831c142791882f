#![warn(rust_2018_idioms)]

pub mod demux;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod srtp;
pub mod tls;

pub use demux::{classify, DemuxClass};
pub use error::{Error, Result};
pub use pipeline::{demux_and_unprotect, Demuxed};
pub use srtp::{SrtpContext, SrtpKeyingMaterial};
pub use tls::{HandshakeStatus, Role, TlsSession};
