#![warn(rust_2018_idioms)]

//! Peer connection (spec.md §4.7 "H2"): transceivers, codec/RTX/data-
//! channel tables, and the inbound datagram demux that ties the ICE,
//! transport, RTP, and RTCP crates together behind one connection
//! lifecycle.

pub mod codec;
pub mod connection;
pub mod data_channel;
pub mod error;
pub mod peer;
pub mod transceiver;

pub use codec::{Codec, CodecTable, RtxTable};
pub use connection::{ConnectionLifecycle, ConnectionState};
pub use data_channel::{DataChannelState, DataChannelTable};
pub use error::{Error, Result};
pub use peer::{Event, PeerConnection};
pub use transceiver::{Direction, ReceiverState, SenderState, Track, TrackKind, Transceiver};
