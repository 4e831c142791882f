//! Data-channel table and id allocation (spec.md §4.7: "the SCTP
//! allocation re-keys data-channel ids to odd or even based on DTLS
//! role"). Grounded on
//! `original_source/src/source/PeerConnection/PeerConnection.c`'s
//! `currentDataChannelId = dtlsIsServer ? 1 : 0` seed and `+= 2` step
//! (RFC 8832 §6: the DTLS client uses even stream ids, the server odd).
//! The SCTP session itself is an external collaborator (spec.md's
//! Non-goals don't budget SCTP as one of the sized components); this
//! table only tracks ids and metadata the peer connection owns.

use std::collections::HashMap;
use transport::Role;

#[derive(Debug, Clone)]
pub struct DataChannelState {
    pub id: u16,
    pub label: String,
    pub ordered: bool,
    pub protocol: String,
}

#[derive(Debug, Clone)]
pub struct DataChannelTable {
    channels: HashMap<u16, DataChannelState>,
    next_id: u16,
}

impl DataChannelTable {
    pub fn new(local_role: Role) -> Self {
        Self {
            channels: HashMap::new(),
            next_id: match local_role {
                Role::Client => 0,
                Role::Server => 1,
            },
        }
    }

    /// Allocates the next id for a locally-opened channel, stepping by
    /// 2 to keep this side's parity.
    pub fn open(&mut self, label: impl Into<String>, ordered: bool, protocol: impl Into<String>) -> u16 {
        let id = self.next_id;
        self.next_id += 2;
        self.channels.insert(
            id,
            DataChannelState {
                id,
                label: label.into(),
                ordered,
                protocol: protocol.into(),
            },
        );
        id
    }

    /// Registers a channel the remote peer opened (its DCEP `OPEN`
    /// carries the id; this side does not allocate it).
    pub fn accept(&mut self, id: u16, label: impl Into<String>, ordered: bool, protocol: impl Into<String>) {
        self.channels.insert(
            id,
            DataChannelState {
                id,
                label: label.into(),
                ordered,
                protocol: protocol.into(),
            },
        );
    }

    pub fn get(&self, id: u16) -> Option<&DataChannelState> {
        self.channels.get(&id)
    }

    pub fn close(&mut self, id: u16) -> Option<DataChannelState> {
        self.channels.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_role_allocates_even_ids() {
        let mut table = DataChannelTable::new(Role::Client);
        assert_eq!(table.open("chat", true, ""), 0);
        assert_eq!(table.open("file", true, ""), 2);
    }

    #[test]
    fn server_role_allocates_odd_ids() {
        let mut table = DataChannelTable::new(Role::Server);
        assert_eq!(table.open("chat", true, ""), 1);
        assert_eq!(table.open("file", true, ""), 3);
    }
}
