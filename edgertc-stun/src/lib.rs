//! STUN/TURN message codec (spec.md §4.1 "STUN codec", L1).
//!
//! This crate is pure codec: it knows how to parse and build STUN
//! messages, verify and attach MESSAGE-INTEGRITY/FINGERPRINT, and apply
//! the XOR-MAPPED-ADDRESS transform. It holds no sockets and no state
//! machine; `edgertc-turn` and `edgertc-ice` build transactions on top
//! of it.

#![warn(rust_2018_idioms)]

pub mod attributes;
pub mod error;
pub mod fingerprint;
pub mod integrity;
pub mod message;
pub mod xoraddr;

pub use attributes::Attribute;
pub use error::{Error, Result};
pub use message::{Class, Message, MAGIC_COOKIE};
