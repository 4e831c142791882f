//! Non-blocking UDP socket primitives and a readiness-driven socket
//! connection set (spec.md §4 "L4 Network primitives", "M1 Socket
//! connection + listener"). This crate has no protocol knowledge; it
//! is the runtime adapter the sans-I/O crates (`edgertc-ice`,
//! `edgertc-turn`, `edgertc-transport`, ...) are wired to by an
//! embedding application.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod listener;
pub mod socket;

pub use error::{Error, Result};
pub use listener::SocketConnectionSet;
pub use socket::{resolve, UdpSocket, UdpSocketBuilder};
