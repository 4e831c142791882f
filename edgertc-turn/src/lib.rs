#![warn(rust_2018_idioms)]

//! TURN client (RFC 5766/8656): the allocate/create-permission/
//! channel-bind state machine described in spec.md §4.2 ("M2"), built
//! on the STUN codec in `edgertc-stun`.

pub mod client;
pub mod error;
pub mod transaction;

pub use client::{Client, Event, State, TurnClientConfig};
pub use error::{Error, Result};
