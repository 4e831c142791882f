#![warn(rust_2018_idioms)]

//! Sans-I/O WebRTC client core (spec.md §1-2). This crate is a facade
//! over the split workspace: it re-exports every sub-crate under a
//! short name and adds nothing of its own beyond a handful of shared
//! constants. An embedder drives the STUN/ICE/TURN/transport/peer
//! types with its own sockets, timers, and DTLS stack; this crate
//! holds no I/O.

pub mod constants;

pub use ice;
pub use net;
pub use peer;
pub use rtcp;
pub use rtp;
pub use sdp;
pub use shared;
pub use signaling;
pub use stun;
pub use transport;
pub use turn;

pub use peer::{Event as PeerEvent, PeerConnection};
pub use signaling::SignalingClient;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn peer_connection_and_signaling_client_wire_up_through_the_facade() {
        let pc = PeerConnection::new(ice::Role::Controlling, transport::Role::Client, Instant::now());
        assert_eq!(pc.local_ice_ufrag().len(), 4);

        let mut client = SignalingClient::new();
        assert!(client.poll_action().is_some());
    }
}
