//! Outstanding-request tracking with exponential-backoff retransmission.
//! Adapted from `rtc-turn/src/client/transaction.rs`'s `Transaction`/
//! `TransactionMap`, generalized over this crate's [`TransactionKind`]
//! instead of the teacher's STUN-crate-specific transaction type.

use bytes::BytesMut;
use shared::{TransportContext, TransportMessage, TransportProtocol};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const MAX_RTX_INTERVAL_MS: u64 = 1600;
const MAX_RTX_COUNT: u16 = 7;
const INITIAL_RTO_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    AllocateAttempt,
    AllocateRequest,
    CreatePermission(SocketAddr),
    Refresh,
    ChannelBind(SocketAddr, u16),
}

pub struct Transaction {
    pub kind: TransactionKind,
    raw: BytesMut,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    n_rtx: u16,
    interval_ms: u64,
    timeout: Instant,
    pending: VecDeque<TransportMessage<BytesMut>>,
}

impl Transaction {
    fn new(kind: TransactionKind, raw: BytesMut, local_addr: SocketAddr, peer_addr: SocketAddr, now: Instant) -> Self {
        let mut tr = Self {
            kind,
            raw,
            local_addr,
            peer_addr,
            n_rtx: 0,
            interval_ms: INITIAL_RTO_MS,
            timeout: now + Duration::from_millis(INITIAL_RTO_MS),
            pending: VecDeque::new(),
        };
        tr.queue_transmit(now);
        tr
    }

    fn queue_transmit(&mut self, now: Instant) {
        self.pending.push_back(TransportMessage {
            now,
            transport: TransportContext {
                local_addr: self.local_addr,
                peer_addr: self.peer_addr,
                transport_protocol: TransportProtocol::Udp,
                ecn: None,
            },
            message: self.raw.clone(),
        });
    }

    fn poll_timeout(&self) -> Option<Instant> {
        (self.n_rtx < MAX_RTX_COUNT).then_some(self.timeout)
    }

    fn handle_timeout(&mut self, now: Instant) {
        if self.n_rtx < MAX_RTX_COUNT && self.timeout <= now {
            self.n_rtx += 1;
            self.interval_ms = (self.interval_ms * 2).min(MAX_RTX_INTERVAL_MS);
            if self.n_rtx < MAX_RTX_COUNT {
                self.queue_transmit(now);
            }
            self.timeout = now + Duration::from_millis(self.interval_ms);
        }
    }

    fn timed_out(&self) -> bool {
        self.n_rtx >= MAX_RTX_COUNT
    }
}

/// A transaction id keyed map with shared retransmission/timeout polling,
/// same shape as the teacher's `TransactionMap`.
#[derive(Default)]
pub struct TransactionMap {
    transactions: HashMap<[u8; 12], Transaction>,
    transmits: VecDeque<TransportMessage<BytesMut>>,
    timed_out: VecDeque<([u8; 12], TransactionKind)>,
}

impl TransactionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        transaction_id: [u8; 12],
        kind: TransactionKind,
        raw: BytesMut,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
        now: Instant,
    ) {
        self.transactions
            .insert(transaction_id, Transaction::new(kind, raw, local_addr, peer_addr, now));
    }

    pub fn remove(&mut self, transaction_id: &[u8; 12]) -> Option<TransactionKind> {
        self.transactions.remove(transaction_id).map(|t| t.kind)
    }

    pub fn contains(&self, transaction_id: &[u8; 12]) -> bool {
        self.transactions.contains_key(transaction_id)
    }

    pub fn poll_timeout(&self) -> Option<Instant> {
        self.transactions.values().filter_map(Transaction::poll_timeout).min()
    }

    pub fn handle_timeout(&mut self, now: Instant) {
        for tr in self.transactions.values_mut() {
            tr.handle_timeout(now);
        }
        let expired: Vec<[u8; 12]> = self
            .transactions
            .iter()
            .filter(|(_, tr)| tr.timed_out())
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(tr) = self.transactions.remove(&id) {
                self.timed_out.push_back((id, tr.kind));
            }
        }
        for tr in self.transactions.values_mut() {
            while let Some(t) = tr.pending.pop_front() {
                self.transmits.push_back(t);
            }
        }
    }

    pub fn poll_transmit(&mut self) -> Option<TransportMessage<BytesMut>> {
        for tr in self.transactions.values_mut() {
            while let Some(t) = tr.pending.pop_front() {
                self.transmits.push_back(t);
            }
        }
        self.transmits.pop_front()
    }

    pub fn poll_timed_out(&mut self) -> Option<([u8; 12], TransactionKind)> {
        self.timed_out.pop_front()
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
    }
}
