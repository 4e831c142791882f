#![warn(rust_2018_idioms)]

pub mod error;
pub mod header;
pub mod jitter;
pub mod packet;
pub mod rolling;

pub use error::{Error, Result};
pub use header::{Extension, Header};
pub use jitter::JitterBuffer;
pub use packet::Packet;
pub use rolling::{Retransmission, RetransmitLimiter, RollingBuffer, RtxConfig};
